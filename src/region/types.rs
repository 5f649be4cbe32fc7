//! Core types for the region subsystem.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Which cascade stage produced a resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegionSource {
    Cache,
    Geo,
    Manual,
    Search,
    Degraded,
    Unresolved,
}

impl fmt::Display for RegionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cache => write!(f, "Cache"),
            Self::Geo => write!(f, "Geo table"),
            Self::Manual => write!(f, "Manual override"),
            Self::Search => write!(f, "Remote search"),
            Self::Degraded => write!(f, "Degraded"),
            Self::Unresolved => write!(f, "Unresolved"),
        }
    }
}

/// The unit of both the cache and the resolver output.
///
/// When `corrected_name` is set, `country_name` and `iso_code` come from the
/// same geo table row. All three may be absent for a region that was never
/// resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolutionRecord {
    /// Input key, with parentheticals already stripped.
    pub raw_key: String,
    /// Canonical region name from the geo table.
    #[serde(default)]
    pub corrected_name: Option<String>,
    #[serde(default)]
    pub country_name: Option<String>,
    /// ISO 3166-1 alpha-2 country code (e.g. "PK", "FR")
    #[serde(default)]
    pub iso_code: Option<String>,
}

impl ResolutionRecord {
    pub fn new(
        raw_key: impl Into<String>,
        corrected_name: Option<String>,
        country_name: Option<String>,
        iso_code: Option<String>,
    ) -> Self {
        Self {
            raw_key: raw_key.into(),
            corrected_name,
            country_name,
            iso_code,
        }
    }

    /// A record with every field absent.
    pub fn unresolved(raw_key: impl Into<String>) -> Self {
        Self::new(raw_key, None, None, None)
    }

    /// A record carrying country data but no geo-validated region name.
    pub fn degraded(
        raw_key: impl Into<String>,
        country_name: Option<String>,
        iso_code: Option<String>,
    ) -> Self {
        Self::new(raw_key, None, country_name, iso_code)
    }

    /// Same record under a different key.
    pub fn rekeyed(&self, raw_key: impl Into<String>) -> Self {
        Self {
            raw_key: raw_key.into(),
            ..self.clone()
        }
    }

    pub fn is_unresolved(&self) -> bool {
        self.corrected_name.is_none() && self.country_name.is_none() && self.iso_code.is_none()
    }

    /// `(corrected_name, country_name, iso_code)` borrowed as string slices.
    pub fn as_tuple(&self) -> (Option<&str>, Option<&str>, Option<&str>) {
        (
            self.corrected_name.as_deref(),
            self.country_name.as_deref(),
            self.iso_code.as_deref(),
        )
    }
}

/// How loudly to report regions that never matched the geo table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MismatchWarning {
    /// Level 0: accept degraded and failed results silently.
    Silent,
    /// Level 1: log a warning when the cascade degrades or fails.
    Warn,
    /// Level 2: currently reported exactly like `Warn`.
    Strict,
}

impl Default for MismatchWarning {
    fn default() -> Self {
        Self::Warn
    }
}

impl MismatchWarning {
    /// Map a numeric level to a setting. Anything above 2 is treated as 2.
    pub fn from_level(level: u8) -> Self {
        match level {
            0 => Self::Silent,
            1 => Self::Warn,
            _ => Self::Strict,
        }
    }

    pub fn enabled(self) -> bool {
        self != Self::Silent
    }
}

/// Region resolution errors.
///
/// "Not found" is not an error here: each stage reports it as `None`.
#[derive(Debug, thiserror::Error)]
pub enum RegionError {
    #[error("Search service returned HTTP {status}: {body}")]
    Status { status: u16, body: String },
    #[error("Network error: {0}")]
    Network(String),
    #[error("Invalid search response: {0}")]
    InvalidResponse(String),
    #[error("Failed to load geo table {path}: {message}")]
    GeoLoad { path: PathBuf, message: String },
    #[error("Failed to load ISO table {path}: {message}")]
    IsoLoad { path: PathBuf, message: String },
    #[error("Unknown text encoding '{0}'")]
    UnknownEncoding(String),
    #[error("Failed to write region store {path}: {source}")]
    StoreWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// End-of-session report returned by `Resolver::close`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionSummary {
    /// Regions that never matched the geo table, deduplicated and sorted.
    pub error_regions: Vec<String>,
    /// Cache entries added during the session.
    pub new_entries: usize,
    /// Whether the cache store was rewritten.
    pub persisted: bool,
}

impl fmt::Display for SessionSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.error_regions.is_empty() {
            writeln!(f, "All regions matched the geo table.")?;
        } else {
            writeln!(f, "The following regions could not be found:")?;
            for region in &self.error_regions {
                writeln!(f, "  - {}", region)?;
            }
        }
        if self.persisted {
            write!(f, "Saved {} new cache entries.", self.new_entries)
        } else {
            write!(f, "Cache unchanged.")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mismatch_levels() {
        assert_eq!(MismatchWarning::from_level(0), MismatchWarning::Silent);
        assert_eq!(MismatchWarning::from_level(1), MismatchWarning::Warn);
        assert_eq!(MismatchWarning::from_level(2), MismatchWarning::Strict);
        assert_eq!(MismatchWarning::from_level(9), MismatchWarning::Strict);
        assert!(!MismatchWarning::Silent.enabled());
        assert!(MismatchWarning::Strict.enabled());
        assert_eq!(MismatchWarning::default(), MismatchWarning::Warn);
    }

    #[test]
    fn test_record_helpers() {
        let rec = ResolutionRecord::degraded("Ile de France", Some("France".into()), Some("FR".into()));
        assert_eq!(rec.as_tuple(), (None, Some("France"), Some("FR")));
        assert!(!rec.is_unresolved());
        assert!(ResolutionRecord::unresolved("Atlantis").is_unresolved());
        assert_eq!(rec.rekeyed("IDF").raw_key, "IDF");
    }

    #[test]
    fn test_summary_display() {
        let summary = SessionSummary {
            error_regions: vec!["Atlantis".into(), "Lemuria".into()],
            new_entries: 3,
            persisted: true,
        };
        let text = summary.to_string();
        assert!(text.contains("could not be found"));
        assert!(text.contains("  - Atlantis"));
        assert!(text.ends_with("Saved 3 new cache entries."));

        let clean = SessionSummary { error_regions: vec![], new_entries: 0, persisted: false };
        assert_eq!(clean.to_string(), "All regions matched the geo table.\nCache unchanged.");
    }
}
