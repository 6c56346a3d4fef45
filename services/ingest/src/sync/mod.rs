pub mod engine;
pub mod rate_limit;
pub mod types;

pub use engine::IncrementalSyncEngine;
pub use rate_limit::RateLimitGovernor;
pub use types::{
    EntitySyncConfig, Page, PageFetcher, PageInfo, PagePersister, PageRequest, RateLimitSnapshot,
    SyncRequest, SyncRunReport, Termination,
};

#[cfg(test)]
pub(crate) mod testing;
