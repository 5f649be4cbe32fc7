//! Reference geo table: admin-1 regions with alternate names and country codes.
//!
//! Loaded once from the attribute table (.dbf) of a Natural Earth style
//! shapefile and joined with the ISO table. Never mutated afterwards.

use super::config::encoding_for_label;
use super::iso::IsoTable;
use super::normalize::strip_administrative_suffix;
use super::types::{RegionError, ResolutionRecord};
use dbase::{FieldValue, Record};
use encoding_rs::Encoding;
use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};

/// Column holding the canonical region name.
pub const CANONICAL_COLUMN: &str = "name";
/// Column holding the two-letter country code.
pub const ISO_COLUMN: &str = "iso_a2";
/// Columns containing "name" that are not region names.
const IGNORED_NAME_COLUMNS: &[&str] = &["name_len", "name_zh"];
/// Rows for this country are dropped at load: the country has since been renamed.
const RENAMED_COUNTRY: &str = "Burma";

/// One region of the geo table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeoRow {
    /// Canonical name (the `name` column).
    pub name: String,
    /// Every candidate name column, aligned with `GeoTable::columns`.
    pub names: Vec<Option<String>>,
    pub iso_code: String,
    /// Joined from the ISO table.
    pub country_name: Option<String>,
}

impl GeoRow {
    /// True if any name column satisfies `pred`.
    pub fn any_name(&self, pred: impl Fn(&str) -> bool) -> bool {
        self.names.iter().flatten().any(|n| pred(n.as_str()))
    }

    /// Only rows with both a country name and an ISO code can be matched.
    pub fn is_complete(&self) -> bool {
        !self.iso_code.is_empty() && self.country_name.as_deref().is_some_and(|c| !c.is_empty())
    }

    fn to_record(&self, key: &str) -> ResolutionRecord {
        ResolutionRecord::new(
            key,
            Some(self.name.clone()),
            self.country_name.clone(),
            Some(self.iso_code.clone()),
        )
    }
}

/// The read-only reference table.
#[derive(Debug, Clone, Default)]
pub struct GeoTable {
    columns: Vec<String>,
    rows: Vec<GeoRow>,
}

/// Rows of `rows` with at least one name column satisfying `pred`, in order.
pub fn rows_where<'a>(
    rows: impl IntoIterator<Item = &'a GeoRow>,
    pred: impl Fn(&str) -> bool,
) -> Vec<&'a GeoRow> {
    rows.into_iter().filter(|row| row.any_name(&pred)).collect()
}

impl GeoTable {
    pub fn new(columns: Vec<String>, rows: Vec<GeoRow>) -> Self {
        Self { columns, rows }
    }

    /// Load the attribute table next to `geo_path` (or `geo_path` itself if it
    /// is a .dbf) and join country names from `iso`.
    ///
    /// Text is decoded with the code page named in the sibling `.cpg`, or as
    /// UTF-8 when there is none. Rows whose ISO code is empty or unknown to
    /// `iso` are dropped.
    pub fn load(geo_path: &Path, iso: &IsoTable) -> Result<Self, RegionError> {
        let dbf_path = attribute_table_path(geo_path);
        let encoding = attribute_encoding(&dbf_path);
        Self::load_with_encoding(geo_path, iso, encoding)
    }

    /// Like [`GeoTable::load`], ignoring any `.cpg` sidecar.
    pub fn load_with_encoding(
        geo_path: &Path,
        iso: &IsoTable,
        encoding: &'static Encoding,
    ) -> Result<Self, RegionError> {
        let dbf_path = attribute_table_path(geo_path);
        let geo_err = |message: String| RegionError::GeoLoad {
            path: dbf_path.clone(),
            message,
        };

        let file = File::open(&dbf_path).map_err(|e| geo_err(e.to_string()))?;
        let mut reader = dbase::ReaderBuilder::new(BufReader::new(file))
            .with_encoding(dbase::encoding::EncodingRs::from(encoding))
            .with_options(
                dbase::ReadingOptions::default().character_trim(dbase::TrimOption::BeginEnd),
            )
            .build()
            .map_err(|e| geo_err(e.to_string()))?;

        let fields: Vec<String> = reader.fields().iter().map(|f| f.name().to_string()).collect();
        for required in [CANONICAL_COLUMN, ISO_COLUMN] {
            if !fields.iter().any(|f| f == required) {
                return Err(geo_err(format!("missing column '{}'", required)));
            }
        }
        let columns: Vec<String> = fields
            .into_iter()
            .filter(|f| f.contains("name") && !IGNORED_NAME_COLUMNS.contains(&f.as_str()))
            .collect();

        let mut rows = Vec::new();
        let mut unjoined = 0usize;
        for record in reader.iter_records() {
            let record = record.map_err(|e| geo_err(e.to_string()))?;
            let Some(name) = text_field(&record, CANONICAL_COLUMN) else {
                continue;
            };
            let iso_code = text_field(&record, ISO_COLUMN).unwrap_or_default();
            let country_name = iso.country_name(&iso_code).map(String::from);
            if country_name.as_deref() == Some(RENAMED_COUNTRY) {
                continue;
            }
            let row = GeoRow {
                name,
                names: columns.iter().map(|c| text_field(&record, c)).collect(),
                iso_code,
                country_name,
            };
            if !row.is_complete() {
                tracing::warn!(
                    region = %row.name,
                    iso = %row.iso_code,
                    "Geo row has no known country, skipping"
                );
                unjoined += 1;
                continue;
            }
            rows.push(row);
        }

        tracing::debug!(
            path = %dbf_path.display(),
            encoding = encoding.name(),
            rows = rows.len(),
            skipped = unjoined,
            columns = columns.len(),
            "Loaded geo table"
        );
        Ok(Self { columns, rows })
    }

    /// Candidate name columns.
    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[GeoRow] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Find the region `query` refers to.
    ///
    /// The query is suffix-stripped, then matched by substring against every
    /// name column. Several hits are narrowed to rows with a name exactly
    /// equal to the original query, failing that to the stripped query;
    /// the first remaining row wins. Rows without a country are never returned.
    pub fn find(&self, query: &str) -> Option<&GeoRow> {
        let normalized = strip_administrative_suffix(query);
        if normalized.is_empty() {
            return None;
        }

        let complete = self.rows.iter().filter(|row| row.is_complete());
        let matched = rows_where(complete, |n| n.contains(normalized.as_str()));
        if matched.len() > 1 {
            let mut exact = rows_where(matched.iter().copied(), |n| n == query);
            if exact.is_empty() {
                exact = rows_where(matched.iter().copied(), |n| n == normalized);
            }
            if let Some(row) = exact.first().copied() {
                return Some(row);
            }
        }
        matched.first().copied()
    }

    /// Like [`GeoTable::find`], returned as a record keyed by `query`.
    pub fn lookup(&self, query: &str) -> Option<ResolutionRecord> {
        self.find(query).map(|row| row.to_record(query))
    }
}

/// `.shp` (or any other sibling) → `.dbf`; a `.dbf` path is kept as-is.
fn attribute_table_path(geo_path: &Path) -> PathBuf {
    let is_dbf = geo_path
        .extension()
        .map(|e| e.eq_ignore_ascii_case("dbf"))
        .unwrap_or(false);
    if is_dbf {
        geo_path.to_path_buf()
    } else {
        geo_path.with_extension("dbf")
    }
}

/// Encoding named by the `.cpg` next to `dbf_path`, UTF-8 when absent or unknown.
fn attribute_encoding(dbf_path: &Path) -> &'static Encoding {
    let cpg_path = dbf_path.with_extension("cpg");
    let Ok(label) = std::fs::read_to_string(&cpg_path) else {
        return encoding_rs::UTF_8;
    };
    let label = label.trim();
    // Bare code page numbers ("1252") name Windows code pages
    let resolved = if !label.is_empty() && label.chars().all(|c| c.is_ascii_digit()) {
        encoding_for_label(&format!("windows-{}", label))
    } else {
        encoding_for_label(label)
    };
    resolved.unwrap_or_else(|_| {
        tracing::warn!(path = %cpg_path.display(), label, "Unknown code page, reading as UTF-8");
        encoding_rs::UTF_8
    })
}

fn text_field(record: &Record, field: &str) -> Option<String> {
    let text = match record.get(field)? {
        FieldValue::Character(Some(s)) => s.as_str(),
        FieldValue::Memo(s) => s.as_str(),
        _ => return None,
    };
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_string())
    }
}
