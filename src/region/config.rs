//! Resolver configuration.
//!
//! Data files default to ~/.admin-regions/. The access token has no default.

use super::types::{MismatchWarning, RegionError};
use encoding_rs::Encoding;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://graph.facebook.com/v8.0/search";
pub const DEFAULT_ENCODING: &str = "latin1";
const DEFAULT_TIMEOUT_SECS: u64 = 30;

const CACHE_FILE: &str = "region_dict.csv";
const MANUAL_FILE: &str = "manual_regions.csv";
const GEO_FILE: &str = "ne_10m_admin_1_states_provinces.shp";
const ISO_FILE: &str = "iso.csv";

const ENV_TOKEN: &str = "ADMIN_REGIONS_ACCESS_TOKEN";
const ENV_DIR: &str = "ADMIN_REGIONS_DIR";

/// Everything the resolver needs to load its data sources.
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    /// Bearer token for the location search service.
    pub access_token: String,
    pub cache_path: PathBuf,
    pub manual_path: PathBuf,
    /// Shapefile (or its .dbf attribute table) with admin-1 regions.
    pub geo_path: PathBuf,
    /// CSV with `iso` and `country_name` columns.
    pub iso_path: PathBuf,
    /// Text encoding of the cache and override stores.
    pub encoding: String,
    pub warn_region_mismatch: MismatchWarning,
    pub search_endpoint: String,
    /// `None` waits on the search service indefinitely.
    pub search_timeout: Option<Duration>,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self::in_dir(default_dir())
    }
}

fn default_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".admin-regions")
}

impl ResolverConfig {
    /// Defaults with every data file inside `dir`.
    pub fn in_dir(dir: impl AsRef<Path>) -> Self {
        let dir = dir.as_ref();
        Self {
            access_token: String::new(),
            cache_path: dir.join(CACHE_FILE),
            manual_path: dir.join(MANUAL_FILE),
            geo_path: dir.join(GEO_FILE),
            iso_path: dir.join(ISO_FILE),
            encoding: DEFAULT_ENCODING.to_string(),
            warn_region_mismatch: MismatchWarning::default(),
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
            search_timeout: Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)),
        }
    }

    /// Defaults, with the data directory and token taken from the environment when set.
    pub fn from_env() -> Self {
        let mut config = match std::env::var_os(ENV_DIR) {
            Some(dir) => Self::in_dir(PathBuf::from(dir)),
            None => Self::default(),
        };
        if let Ok(token) = std::env::var(ENV_TOKEN) {
            config.access_token = token;
        }
        config
    }

    pub fn with_access_token(mut self, token: impl Into<String>) -> Self {
        self.access_token = token.into();
        self
    }

    pub fn with_cache_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.cache_path = path.into();
        self
    }

    pub fn with_manual_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.manual_path = path.into();
        self
    }

    pub fn with_geo_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.geo_path = path.into();
        self
    }

    pub fn with_iso_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.iso_path = path.into();
        self
    }

    pub fn with_encoding(mut self, label: impl Into<String>) -> Self {
        self.encoding = label.into();
        self
    }

    pub fn with_warn_region_mismatch(mut self, level: u8) -> Self {
        self.warn_region_mismatch = MismatchWarning::from_level(level);
        self
    }

    pub fn with_search_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.search_endpoint = endpoint.into();
        self
    }

    pub fn with_search_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.search_timeout = timeout;
        self
    }

    /// Resolve the configured encoding label.
    pub fn text_encoding(&self) -> Result<&'static Encoding, RegionError> {
        encoding_for_label(&self.encoding)
    }
}

/// Look up a WHATWG encoding label. Hyphenated spellings such as "latin-1"
/// are retried without the hyphen.
pub fn encoding_for_label(label: &str) -> Result<&'static Encoding, RegionError> {
    let trimmed = label.trim();
    Encoding::for_label(trimmed.as_bytes())
        .or_else(|| Encoding::for_label(trimmed.replace('-', "").as_bytes()))
        .ok_or_else(|| RegionError::UnknownEncoding(label.to_string()))
}
