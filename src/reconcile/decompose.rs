// src/reconcile/decompose.rs

use crate::interpolate::cohort::VARIABLE_DELIMITER;
use crate::table::Record;

/// Split a composite demographic variable into
/// {variable, gender, cohort, education}.
///
/// `Population|Male|Aged0-4|No Education` becomes `Population` with the three
/// components set; missing trailing components stay unset. Anything after a
/// fourth delimiter remains part of the education component.
pub fn decompose(record: &Record) -> Record {
    let mut parts = record.variable.splitn(4, VARIABLE_DELIMITER).map(str::trim);
    let variable = parts.next().unwrap_or_default().to_string();
    let mut component = || parts.next().filter(|p| !p.is_empty()).map(str::to_string);
    let gender = component();
    let cohort = component();
    let education = component();

    Record {
        variable,
        gender: gender.or_else(|| record.gender.clone()),
        cohort: cohort.or_else(|| record.cohort.clone()),
        education: education.or_else(|| record.education.clone()),
        ..record.clone()
    }
}
