//! Region resolution subsystem.
//!
//! Turns free-text administrative region names into a canonical region name,
//! a country name and an ISO country code, using a local cache, a reference
//! geo table, manual overrides and a remote location search.

pub mod config;
pub mod geo;
pub mod iso;
pub mod normalize;
pub mod providers;
pub mod resolver;
pub mod store;
pub mod types;

pub use config::ResolverConfig;
pub use geo::{GeoRow, GeoTable};
pub use iso::IsoTable;
pub use normalize::{strip_administrative_suffix, strip_parentheticals};
pub use providers::{GraphSearchClient, RegionSearch, SearchCandidate};
pub use resolver::Resolver;
pub use store::RegionStore;
pub use types::{MismatchWarning, RegionError, RegionSource, ResolutionRecord, SessionSummary};
