// src/aggregate/override_file.rs

//! Reader for aggregation-definition files.
//!
//! ```text
//! ! Section Regional aggregation
//! ! source & target & free text
//! aus & oce & Australia
//! ```
//! Lines starting with `!` are comments; `! Section <name>` opens a section.
//! Every other non-blank line is a record whose `&`-separated fields start
//! with the source code and the target code.

use anyhow::{Context, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use std::{collections::HashMap, fs, path::Path};
use tracing::{debug, warn};

static SECTION_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^!\s*section\s+(.+?)\s*$").expect("section regex"));

/// Two-column source → target code table, keyed case-insensitively.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AggOverride {
    map: HashMap<String, String>,
}

impl AggOverride {
    /// Parse `text`, keeping only records of `section` when given
    /// (section names compare case-insensitively).
    pub fn parse(text: &str, section: Option<&str>) -> Self {
        let wanted = section.map(|s| s.trim().to_lowercase());
        let mut current: Option<String> = None;
        let mut map = HashMap::new();

        for (lineno, raw) in text.lines().enumerate() {
            let line = raw.trim();
            if line.is_empty() {
                continue;
            }
            if line.starts_with('!') {
                if let Some(caps) = SECTION_RE.captures(line) {
                    current = Some(caps[1].to_lowercase());
                }
                continue;
            }
            if wanted.is_some() && current != wanted {
                continue;
            }
            let fields: Vec<&str> = line.split('&').map(str::trim).collect();
            match fields.as_slice() {
                [source, target, ..] if !source.is_empty() && !target.is_empty() => {
                    map.insert(source.to_lowercase(), target.to_string());
                }
                _ => warn!(line = lineno + 1, text = %line, "skipping malformed aggregation record"),
            }
        }
        debug!(entries = map.len(), "parsed aggregation override");
        Self { map }
    }

    pub fn from_path<P: AsRef<Path>>(path: P, section: Option<&str>) -> Result<Self> {
        let text = fs::read_to_string(&path)
            .with_context(|| format!("reading aggregation file {:?}", path.as_ref()))?;
        Ok(Self::parse(&text, section))
    }

    pub fn target_for(&self, source: &str) -> Option<&str> {
        self.map.get(&source.trim().to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = "! GTAP aggregation\n\
        ! Section Sectors\n\
        pdr & grains & Paddy rice\n\
        ! Section Regions\n\
        ! code & aggregate & name\n\
        aus & OCE & Australia\n\
        \n\
        NZL&OCE\n\
        broken line without separator\n";

    #[test]
    fn reads_records_and_skips_comments() {
        let agg = AggOverride::parse(SAMPLE, None);
        assert_eq!(agg.len(), 3);
        assert_eq!(agg.target_for("PDR"), Some("grains"));
        assert_eq!(agg.target_for("nzl"), Some("OCE"));
        assert_eq!(agg.target_for("fra"), None);
    }

    #[test]
    fn section_filter_limits_records() {
        let agg = AggOverride::parse(SAMPLE, Some("regions"));
        assert_eq!(agg.len(), 2);
        assert_eq!(agg.target_for("pdr"), None);
        assert_eq!(agg.target_for(" Aus "), Some("OCE"));
    }

    #[test]
    fn loads_from_disk() -> Result<()> {
        let tmp = tempfile::NamedTempFile::new()?;
        fs::write(tmp.path(), SAMPLE)?;
        assert_eq!(AggOverride::from_path(tmp.path(), Some("Sectors"))?.len(), 1);
        Ok(())
    }
}
