//! `adsmap-resolve`: name-to-ID entity resolution for Amazon Ads reports.
//!
//! Pure engine crate: receives pre-parsed report rows and the lookup tables,
//! returns fact rows keyed by stable IDs plus deduplicated mapping issues.
//! No database or report-file parsing.

pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod issues;
pub mod load;
pub mod mapper;
pub mod model;
pub mod normalize;
pub mod resolver;
pub mod snapshot;
pub mod summary;
pub mod temporal;

pub use config::MappingConfig;
pub use engine::{map_uploads_parallel, run};
pub use error::MappingError;
pub use index::LookupIndex;
pub use issues::IssueCollector;
pub use model::{MappingIssue, MappingResult, PassParams, Report, ResolvedId};
pub use snapshot::pick_snapshot;
pub use temporal::is_within_range;
