// src/table/mod.rs

//! Typed long-format tables shared by every stage.
//!
//! A table is an immutable, owned list of rows. Stages borrow their input and
//! return a freshly built table, so each step can be run and tested alone.

pub mod group;
pub mod merge;

pub use group::{partition, GroupKey, PartitionKey, DEFAULT_GROUP_FIELDS};
pub use merge::{keyed_merge, ConflictPolicy};

use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr};

/// Inclusive bounds for calendar years accepted anywhere in the pipeline.
pub const YEAR_MIN: i32 = 1500;
pub const YEAR_MAX: i32 = 3000;

/// Named columns of the long-format schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Model,
    Scenario,
    Region,
    Variable,
    Unit,
    Gender,
    Cohort,
    Education,
    Year,
    Value,
}

impl Field {
    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Model => "model",
            Field::Scenario => "scenario",
            Field::Region => "region",
            Field::Variable => "variable",
            Field::Unit => "unit",
            Field::Gender => "gender",
            Field::Cohort => "cohort",
            Field::Education => "education",
            Field::Year => "year",
            Field::Value => "value",
        }
    }

    /// `year` and `value` are the series axes and never part of a key.
    pub fn is_categorical(&self) -> bool {
        !matches!(self, Field::Year | Field::Value)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "model" => Ok(Field::Model),
            "scenario" => Ok(Field::Scenario),
            "region" => Ok(Field::Region),
            "variable" => Ok(Field::Variable),
            "unit" => Ok(Field::Unit),
            "gender" | "sex" => Ok(Field::Gender),
            "cohort" | "age" => Ok(Field::Cohort),
            "education" | "edu" => Ok(Field::Education),
            "year" => Ok(Field::Year),
            "value" => Ok(Field::Value),
            _ => Err(EngineError::UnknownField(s.to_string())),
        }
    }
}

/// Row access used by the generic partition, merge and growth code.
pub trait Observation {
    /// Categorical value of `field`; `None` for unset components and for
    /// the year/value axes.
    fn field(&self, field: Field) -> Option<&str>;
    fn year(&self) -> i32;
    fn value(&self) -> f64;
    /// Copy of this row moved to another point of its series.
    fn with_point(&self, year: i32, value: f64) -> Self;
}

/// One long-format observation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Record {
    pub model: String,
    pub scenario: String,
    pub region: String,
    pub variable: String,
    pub unit: String,
    pub gender: Option<String>,
    pub cohort: Option<String>,
    pub education: Option<String>,
    pub year: i32,
    pub value: f64,
}

impl Record {
    pub fn new(
        model: impl Into<String>,
        scenario: impl Into<String>,
        region: impl Into<String>,
        variable: impl Into<String>,
        unit: impl Into<String>,
        year: i32,
        value: f64,
    ) -> Self {
        Self {
            model: model.into(),
            scenario: scenario.into(),
            region: region.into(),
            variable: variable.into(),
            unit: unit.into(),
            gender: None,
            cohort: None,
            education: None,
            year,
            value,
        }
    }
}

impl Observation for Record {
    fn field(&self, field: Field) -> Option<&str> {
        match field {
            Field::Model => Some(&self.model),
            Field::Scenario => Some(&self.scenario),
            Field::Region => Some(&self.region),
            Field::Variable => Some(&self.variable),
            Field::Unit => Some(&self.unit),
            Field::Gender => self.gender.as_deref(),
            Field::Cohort => self.cohort.as_deref(),
            Field::Education => self.education.as_deref(),
            Field::Year | Field::Value => None,
        }
    }

    fn year(&self) -> i32 {
        self.year
    }

    fn value(&self) -> f64 {
        self.value
    }

    fn with_point(&self, year: i32, value: f64) -> Self {
        Self {
            year,
            value,
            ..self.clone()
        }
    }
}

/// Owned, read-only collection of rows produced by one stage.
#[derive(Debug, Clone, PartialEq)]
pub struct Table<R = Record> {
    rows: Vec<R>,
}

impl<R> Table<R> {
    pub fn new(rows: Vec<R>) -> Self {
        Self { rows }
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, R> {
        self.rows.iter()
    }

    pub fn into_rows(self) -> Vec<R> {
        self.rows
    }
}

impl<R> Default for Table<R> {
    fn default() -> Self {
        Self { rows: Vec::new() }
    }
}

impl<R> FromIterator<R> for Table<R> {
    fn from_iter<I: IntoIterator<Item = R>>(iter: I) -> Self {
        Self {
            rows: iter.into_iter().collect(),
        }
    }
}

impl<R> IntoIterator for Table<R> {
    type Item = R;
    type IntoIter = std::vec::IntoIter<R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.into_iter()
    }
}

impl<'a, R> IntoIterator for &'a Table<R> {
    type Item = &'a R;
    type IntoIter = std::slice::Iter<'a, R>;

    fn into_iter(self) -> Self::IntoIter {
        self.rows.iter()
    }
}
