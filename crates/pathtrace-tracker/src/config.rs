//! Choice tracker options, bound from the `choice.*` configuration keys.
use std::path::PathBuf;
use std::str::FromStr;

use pathtrace_model::choice::CgKind;
use pathtrace_model::config::Config;
use serde::{Deserialize, Serialize};
use tracing::warn;

pub const TRACE_KEY: &str = "choice.trace";
pub const EXCLUDE_KEY: &str = "choice.exclude";
pub const CLASS_KEY: &str = "choice.class";
pub const FORMAT_KEY: &str = "choice.format";
pub const SHOW_LOCATION_KEY: &str = "choice.show_location";

/// How a choice point is rendered in the trace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Format {
    /// The generator's textual form.
    #[default]
    Cg,
    /// The chosen value's textual form.
    Choice,
}

#[derive(Debug, thiserror::Error)]
#[error("unknown choice format '{0}', expected CG or CHOICE")]
pub struct UnknownFormat(pub String);

impl FromStr for Format {
    type Err = UnknownFormat;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.eq_ignore_ascii_case("cg") {
            Ok(Format::Cg)
        } else if s.eq_ignore_ascii_case("choice") {
            Ok(Format::Choice)
        } else {
            Err(UnknownFormat(s.to_string()))
        }
    }
}

/// Bound once when the tracker attaches, never mutated by the pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Trace file. None = contribute to the shared report instead.
    pub trace: Option<PathBuf>,
    /// Choice values starting with any of these prefixes are not reported.
    pub excludes: Vec<String>,
    /// Generator kinds to report, including their specializations.
    /// Empty = every kind.
    pub allowed: Vec<CgKind>,
    pub format: Format,
    /// Append each generator's source location.
    pub show_location: bool,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            trace: None,
            excludes: Vec::new(),
            allowed: Vec::new(),
            format: Format::Cg,
            show_location: true,
        }
    }
}

impl TrackerConfig {
    /// Bind the `choice.*` keys. Missing or malformed values fall back to
    /// the defaults; this never fails.
    pub fn from_config(config: &Config) -> Self {
        let defaults = Self::default();
        Self {
            trace: config.get_string(TRACE_KEY).map(PathBuf::from),
            excludes: config.get_string_array(EXCLUDE_KEY).unwrap_or_default(),
            allowed: resolve_kinds(&config.get_string_array(CLASS_KEY).unwrap_or_default()),
            format: config.get_enum(FORMAT_KEY, defaults.format),
            show_location: config.get_bool(SHOW_LOCATION_KEY, defaults.show_location),
        }
    }

    /// True when the trace goes into the shared report.
    pub fn is_report_extension(&self) -> bool {
        self.trace.is_none()
    }
}

/// Resolve kind names, dropping unknown names and duplicates.
fn resolve_kinds(names: &[String]) -> Vec<CgKind> {
    let mut kinds = Vec::with_capacity(names.len());
    for name in names {
        match CgKind::from_name(name) {
            Some(kind) if !kinds.contains(&kind) => kinds.push(kind),
            Some(_) => {}
            None => warn!(name = %name, "ignoring unknown choice generator kind"),
        }
    }
    kinds
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_parse_is_case_insensitive() {
        assert_eq!("choice".parse::<Format>().unwrap(), Format::Choice);
        assert_eq!("CG".parse::<Format>().unwrap(), Format::Cg);
        assert!("json".parse::<Format>().is_err());
    }

    #[test]
    fn test_resolve_kinds_drops_unknown_and_duplicates() {
        let names = vec![
            "BooleanChoiceGenerator".to_string(),
            "Bogus".to_string(),
            "pathtrace::choice::BooleanChoiceGenerator".to_string(),
        ];
        assert_eq!(resolve_kinds(&names), vec![CgKind::BooleanChoiceGenerator]);
    }
}
