// src/table/group.rs

use super::{Field, Observation};
use crate::error::{EngineError, Result};
use std::{collections::BTreeMap, fmt};

/// Recognized default grouping: one series per (model, scenario, region, variable, unit).
pub const DEFAULT_GROUP_FIELDS: [Field; 5] = [
    Field::Model,
    Field::Scenario,
    Field::Region,
    Field::Variable,
    Field::Unit,
];

/// Ordered set of categorical fields that defines independent partitions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupKey {
    fields: Vec<Field>,
}

impl GroupKey {
    /// Build a key from fields, rejecting empty keys and the year/value axes.
    /// Repeated fields are kept once, in first-seen order.
    pub fn new<I: IntoIterator<Item = Field>>(fields: I) -> Result<Self> {
        let mut out: Vec<Field> = Vec::new();
        for f in fields {
            if !f.is_categorical() {
                return Err(EngineError::ReservedField(f.as_str().to_string()));
            }
            if !out.contains(&f) {
                out.push(f);
            }
        }
        if out.is_empty() {
            return Err(EngineError::EmptyGroupKey);
        }
        Ok(Self { fields: out })
    }

    /// Parse caller-supplied column names.
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        let fields = names
            .iter()
            .map(|n| n.as_ref().parse::<Field>())
            .collect::<Result<Vec<_>>>()?;
        Self::new(fields)
    }

    pub fn default_fields() -> Self {
        Self::fixed(&DEFAULT_GROUP_FIELDS)
    }

    /// Key over a known-good, non-empty list of categorical fields.
    pub(crate) fn fixed(fields: &[Field]) -> Self {
        debug_assert!(!fields.is_empty() && fields.iter().all(Field::is_categorical));
        Self {
            fields: fields.to_vec(),
        }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn key_of<R: Observation>(&self, row: &R) -> PartitionKey {
        PartitionKey(
            self.fields
                .iter()
                .map(|f| row.field(*f).map(str::to_string))
                .collect(),
        )
    }
}

impl Default for GroupKey {
    fn default() -> Self {
        Self::default_fields()
    }
}

/// The concrete values of a [`GroupKey`] for one partition.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PartitionKey(pub Vec<Option<String>>);

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<&str> = self.0.iter().map(|v| v.as_deref().unwrap_or("-")).collect();
        f.write_str(&parts.join(" / "))
    }
}

/// Split `rows` into partitions keyed by `key`, in sorted key order.
/// Rows keep their input order inside each partition.
pub fn partition<'a, R: Observation>(
    rows: &'a [R],
    key: &GroupKey,
) -> BTreeMap<PartitionKey, Vec<&'a R>> {
    let mut parts: BTreeMap<PartitionKey, Vec<&'a R>> = BTreeMap::new();
    for row in rows {
        parts.entry(key.key_of(row)).or_default().push(row);
    }
    parts
}
