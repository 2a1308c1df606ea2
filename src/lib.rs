pub mod config;
pub mod dates;
pub mod executor;
pub mod harvest;
pub mod model;
pub mod normalize;
pub mod query;
pub mod store;
pub mod tags;
pub mod traits;

// Re-export common types for convenience
pub use executor::*;
pub use model::*;
pub use traits::*;

pub use harvest::{HarvestOptions, HarvestPipeline, HarvestResult, SourceRegistry};
pub use normalize::{format_event, StandardNormalizer};
pub use store::{EventStore, MemoryEventStore, SqliteEventStore, StoreError};
