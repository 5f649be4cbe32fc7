//! Admin Regions: resolve non-standard region names for mapping.
//!
//! ```no_run
//! use admin_regions::{Resolver, ResolverConfig};
//!
//! let config = ResolverConfig::from_env();
//! let mut resolver = Resolver::new(&config)?;
//! let record = resolver.region_to_country("Sindh Province")?;
//! println!("{:?}", record.as_tuple());
//! let summary = resolver.close()?;
//! eprintln!("{}", summary);
//! # Ok::<(), admin_regions::RegionError>(())
//! ```

pub mod region;

pub use region::{
    MismatchWarning, RegionError, RegionSearch, RegionStore, ResolutionRecord, Resolver,
    ResolverConfig, SessionSummary,
};
