//! File-backed region tables: the resolution cache and the manual overrides.
//!
//! Headerless CSV, one row per key: `raw key, corrected name, country, iso`.
//! Empty fields mean "absent". Text is decoded and encoded with the
//! configured encoding (latin-1 by default).

use super::types::{RegionError, ResolutionRecord};
use encoding_rs::Encoding;
use indexmap::IndexMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

const FIELDS_PER_ROW: usize = 4;

/// An insertion-ordered key → record table with an optional backing file.
#[derive(Debug, Clone)]
pub struct RegionStore {
    path: Option<PathBuf>,
    encoding: &'static Encoding,
    entries: IndexMap<String, ResolutionRecord>,
}

impl RegionStore {
    /// An empty, in-memory table.
    pub fn in_memory() -> Self {
        Self {
            path: None,
            encoding: encoding_rs::UTF_8,
            entries: IndexMap::new(),
        }
    }

    /// Load from `path`. A missing or unreadable file yields an empty table
    /// plus a warning; malformed rows are skipped one by one.
    pub fn load_from(path: impl Into<PathBuf>, encoding: &'static Encoding) -> Self {
        let path = path.into();
        let entries = match fs::read(&path) {
            Ok(bytes) => parse_rows(&path, &bytes, encoding),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "Failed to read region store, starting empty");
                IndexMap::new()
            }
        };
        Self {
            path: Some(path),
            encoding,
            entries,
        }
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn get(&self, key: &str) -> Option<&ResolutionRecord> {
        self.entries.get(key)
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Insert `record` under its key unless the key is already taken.
    /// Returns the record now stored under that key.
    pub fn insert_new(&mut self, record: ResolutionRecord) -> &ResolutionRecord {
        self.entries
            .entry(record.raw_key.clone())
            .or_insert(record)
    }

    /// Drop every key that is also present in `other`.
    pub fn exclude_keys_of(&mut self, other: &RegionStore) {
        self.entries.retain(|key, _| !other.contains_key(key));
    }

    pub fn iter(&self) -> impl Iterator<Item = &ResolutionRecord> {
        self.entries.values()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Write every row to the backing file. Rows the encoding cannot
    /// represent are logged and skipped. Returns the number of rows written.
    pub fn persist(&self) -> Result<usize, RegionError> {
        let Some(path) = self.path.as_deref() else {
            return Ok(0);
        };

        let mut out = Vec::new();
        let mut written = 0;
        for record in self.entries.values() {
            match encode_row(record, self.encoding) {
                Some(bytes) => {
                    out.extend_from_slice(&bytes);
                    written += 1;
                }
                None => tracing::warn!(
                    key = %record.raw_key,
                    corrected = record.corrected_name.as_deref().unwrap_or(""),
                    country = record.country_name.as_deref().unwrap_or(""),
                    iso = record.iso_code.as_deref().unwrap_or(""),
                    encoding = self.encoding.name(),
                    "Failed writing region store row"
                ),
            }
        }

        let write_err = |source| RegionError::StoreWrite {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(write_err)?;
        }
        {
            let mut file = fs::File::create(path).map_err(write_err)?;
            file.write_all(&out).map_err(write_err)?;
            file.flush().map_err(write_err)?;
        }
        Ok(written)
    }
}

fn non_empty(field: &str) -> Option<String> {
    if field.is_empty() {
        None
    } else {
        Some(field.to_string())
    }
}

fn parse_rows(
    path: &Path,
    bytes: &[u8],
    encoding: &'static Encoding,
) -> IndexMap<String, ResolutionRecord> {
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        tracing::warn!(
            path = %path.display(),
            encoding = encoding.name(),
            "Region store is not valid in the configured encoding, starting empty"
        );
        return IndexMap::new();
    }

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut entries = IndexMap::new();
    for (i, row) in reader.records().enumerate() {
        let row = match row {
            Ok(row) => row,
            Err(e) => {
                tracing::warn!(path = %path.display(), row = i + 1, error = %e, "Skipping unreadable region store row");
                continue;
            }
        };
        if row.len() < FIELDS_PER_ROW {
            tracing::warn!(path = %path.display(), row = i + 1, fields = row.len(), "Skipping short region store row");
            continue;
        }
        let record = ResolutionRecord::new(
            &row[0],
            non_empty(&row[1]),
            non_empty(&row[2]),
            non_empty(&row[3]),
        );
        entries.insert(record.raw_key.clone(), record);
    }
    entries
}

/// One CSV line in the target encoding, or `None` if it can't be encoded.
fn encode_row(record: &ResolutionRecord, encoding: &'static Encoding) -> Option<Vec<u8>> {
    let fields = [
        record.raw_key.as_str(),
        record.corrected_name.as_deref().unwrap_or(""),
        record.country_name.as_deref().unwrap_or(""),
        record.iso_code.as_deref().unwrap_or(""),
    ];
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_writer(Vec::new());
    writer.write_record(fields).ok()?;
    let line = String::from_utf8(writer.into_inner().ok()?).ok()?;

    let (bytes, _, unmappable) = encoding.encode(&line);
    if unmappable {
        None
    } else {
        Some(bytes.into_owned())
    }
}
