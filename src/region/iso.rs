//! ISO 3166-1 alpha-2 code → country name table.

use super::types::RegionError;
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

#[derive(Debug, Deserialize)]
struct IsoRow {
    iso: String,
    country_name: String,
}

/// Static code → country name lookup.
#[derive(Debug, Clone, Default)]
pub struct IsoTable {
    names: HashMap<String, String>,
}

impl IsoTable {
    /// Load a CSV with a header row containing `iso` and `country_name`.
    /// Extra columns are ignored. "NA" (Namibia) is kept as a code.
    pub fn load(path: &Path) -> Result<Self, RegionError> {
        let iso_err = |message: String| RegionError::IsoLoad {
            path: path.to_path_buf(),
            message,
        };
        let mut reader = csv::Reader::from_path(path).map_err(|e| iso_err(e.to_string()))?;
        let mut names = HashMap::new();
        for row in reader.deserialize() {
            let row: IsoRow = row.map_err(|e| iso_err(e.to_string()))?;
            names.insert(row.iso, row.country_name);
        }
        Ok(Self { names })
    }

    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            names: pairs.into_iter().map(|(k, v)| (k.into(), v.into())).collect(),
        }
    }

    pub fn country_name(&self, iso: &str) -> Option<&str> {
        self.names.get(iso).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }
}
