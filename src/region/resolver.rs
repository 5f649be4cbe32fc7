//! Region resolver: orchestrates the lookup cascade.
//!
//! Flow:  Cache → geo table → manual override → geo table
//!        → remote search → geo table → degraded (country only) → unresolved
//!
//! Every terminal outcome is written to the cache under the cleaned region
//! key, so a region is looked up at most once per session.

use super::config::ResolverConfig;
use super::geo::GeoTable;
use super::iso::IsoTable;
use super::normalize::{strip_administrative_suffix, strip_parentheticals, SUFFIXES};
use super::providers::{GraphSearchClient, RegionSearch, SearchCandidate};
use super::store::RegionStore;
use super::types::{MismatchWarning, RegionError, RegionSource, ResolutionRecord, SessionSummary};

/// One resolution session over a fixed set of data sources.
///
/// The cache only grows while the session is open. Call [`Resolver::close`]
/// to write it back; dropping the resolver writes nothing.
pub struct Resolver {
    geo: GeoTable,
    cache: RegionStore,
    manual: RegionStore,
    search: Box<dyn RegionSearch>,
    warn_region_mismatch: MismatchWarning,
    initial_cache_len: usize,
    dirty: bool,
    error_regions: Vec<String>,
}

impl Resolver {
    /// Load every data source named by `config`.
    ///
    /// The geo and ISO tables are required. Missing cache or override files
    /// only produce a warning.
    pub fn new(config: &ResolverConfig) -> Result<Self, RegionError> {
        let encoding = config.text_encoding()?;
        let iso = IsoTable::load(&config.iso_path)?;
        let geo = GeoTable::load(&config.geo_path, &iso)?;
        let cache = RegionStore::load_from(&config.cache_path, encoding);
        let manual = RegionStore::load_from(&config.manual_path, encoding);
        let search = GraphSearchClient::from_config(config);
        Ok(Self::from_parts(geo, cache, manual, Box::new(search), config.warn_region_mismatch))
    }

    /// Assemble a resolver from already-loaded parts.
    ///
    /// Override entries whose key is already cached are dropped.
    pub fn from_parts(
        geo: GeoTable,
        cache: RegionStore,
        mut manual: RegionStore,
        search: Box<dyn RegionSearch>,
        warn_region_mismatch: MismatchWarning,
    ) -> Self {
        manual.exclude_keys_of(&cache);
        Self {
            initial_cache_len: cache.len(),
            geo,
            cache,
            manual,
            search,
            warn_region_mismatch,
            dirty: false,
            error_regions: Vec::new(),
        }
    }

    pub fn cache(&self) -> &RegionStore {
        &self.cache
    }

    pub fn manual_overrides(&self) -> &RegionStore {
        &self.manual
    }

    pub fn geo(&self) -> &GeoTable {
        &self.geo
    }

    /// Regions that never matched the geo table, in the order they failed.
    pub fn error_regions(&self) -> &[String] {
        &self.error_regions
    }

    /// Resolve a free-text region to `(canonical name, country, iso)`.
    ///
    /// Only a failing search service is an error; a region nobody knows
    /// comes back as an all-absent record.
    pub fn region_to_country(&mut self, region: &str) -> Result<ResolutionRecord, RegionError> {
        let region = strip_parentheticals(region);
        if region.trim().is_empty() {
            tracing::debug!(source = %RegionSource::Unresolved, "Nothing left of region to resolve");
            return Ok(ResolutionRecord::unresolved(region.as_str()));
        }

        // 1. Cache, including cached failures
        if let Some(record) = self.cache.get(&region) {
            tracing::debug!(region = %region, source = %RegionSource::Cache, "Resolved region");
            return Ok(record.clone());
        }

        // 2. Geo table directly
        if let Some(record) = self.region_to_country_from_geo(&region) {
            tracing::debug!(region = %region, source = %RegionSource::Geo, "Resolved region");
            return Ok(record);
        }

        // 3. Manual override name → geo table
        let manual = self.manual.get(&region).cloned();
        let override_name = manual
            .as_ref()
            .and_then(|m| m.corrected_name.as_deref())
            .filter(|name| !name.is_empty());
        if let Some(name) = override_name {
            if let Some(record) = self.region_to_country_from_geo(name) {
                tracing::debug!(region = %region, source = %RegionSource::Manual, "Resolved region");
                return Ok(self.remember(record.rekeyed(region.as_str())));
            }
        }

        // 4. Remote search → geo table
        let searched = self.region_to_country_from_search(&region)?;
        if let Some(hit) = &searched {
            if let Some(record) = self.region_to_country_from_geo(&hit.name) {
                tracing::debug!(region = %region, source = %RegionSource::Search, "Resolved region");
                return Ok(self.remember(record.rekeyed(region.as_str())));
            }
        }

        // 5. Country only, without a geo table match
        self.error_regions.push(region.clone());
        if self.warn_region_mismatch.enabled() {
            tracing::warn!(region = %region, "Region will not match the geo table");
        }

        let degraded = manual
            .filter(|m| m.country_name.is_some() && m.iso_code.is_some())
            .map(|m| ResolutionRecord::degraded(region.as_str(), m.country_name, m.iso_code))
            .or_else(|| {
                searched
                    .map(|hit| {
                        ResolutionRecord::degraded(
                            region.as_str(),
                            non_empty(hit.country_name),
                            non_empty(hit.country_code),
                        )
                    })
                    .filter(|record| !record.is_unresolved())
            });

        match degraded {
            Some(record) => {
                tracing::debug!(region = %region, source = %RegionSource::Degraded, "Resolved region");
                Ok(self.remember(record))
            }
            None => {
                if self.warn_region_mismatch.enabled() {
                    tracing::warn!(region = %region, "Region not found anywhere");
                }
                tracing::debug!(region = %region, source = %RegionSource::Unresolved, "Resolved region");
                Ok(self.remember(ResolutionRecord::unresolved(region.as_str())))
            }
        }
    }

    /// Resolve many regions in order, stopping at the first hard error.
    pub fn regions_to_countries<I, S>(
        &mut self,
        regions: I,
    ) -> Result<Vec<ResolutionRecord>, RegionError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        regions
            .into_iter()
            .map(|region| self.region_to_country(region.as_ref()))
            .collect()
    }

    /// Match `query` against the geo table, caching a hit under `query`.
    pub fn region_to_country_from_geo(&mut self, query: &str) -> Option<ResolutionRecord> {
        let record = self.geo.lookup(query)?;
        self.remember(record.clone());
        Some(record)
    }

    /// Ask the search service for `query`, retrying with administrative
    /// words stripped while that still changes the query. Returns the top
    /// candidate, which has not been checked against the geo table.
    pub fn region_to_country_from_search(
        &mut self,
        query: &str,
    ) -> Result<Option<SearchCandidate>, RegionError> {
        let mut current = query.to_string();
        for _ in 0..=SUFFIXES.len() {
            if let Some(top) = self.search.search(&current)?.into_iter().next() {
                return Ok(Some(top));
            }
            let stripped = strip_administrative_suffix(&current);
            if stripped == current || stripped.is_empty() {
                break;
            }
            current = stripped;
        }
        Ok(None)
    }

    /// Insert into the cache unless the key is taken; returns what is cached.
    fn remember(&mut self, record: ResolutionRecord) -> ResolutionRecord {
        let before = self.cache.len();
        let stored = self.cache.insert_new(record).clone();
        if self.cache.len() > before {
            self.dirty = true;
        }
        stored
    }

    /// End the session: report unmatched regions and write the cache back
    /// if it grew.
    pub fn close(self) -> Result<SessionSummary, RegionError> {
        let mut error_regions = self.error_regions;
        error_regions.sort();
        error_regions.dedup();

        let new_entries = self.cache.len().saturating_sub(self.initial_cache_len);
        let persisted = if self.dirty && new_entries > 0 && self.cache.path().is_some() {
            let rows = self.cache.persist()?;
            tracing::info!(rows, new_entries, "Saved region cache");
            true
        } else {
            false
        };

        let summary = SessionSummary {
            error_regions,
            new_entries,
            persisted,
        };
        tracing::info!(unmatched = ?summary.error_regions, "{}", summary);
        Ok(summary)
    }
}

fn non_empty(s: String) -> Option<String> {
    if s.is_empty() {
        None
    } else {
        Some(s)
    }
}
