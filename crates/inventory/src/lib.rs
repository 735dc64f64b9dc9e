//! Inventory catalog module.
//!
//! Ingests the loosely structured records handed over by the external
//! inventory system, normalizes them into `ItemInstance`s and exposes them as
//! an immutable, point-in-time `CatalogSnapshot`. Pure domain logic (no IO).

pub mod catalog;
pub mod instance;
pub mod search;

pub use catalog::CatalogSnapshot;
pub use instance::{
    Allocation, AllocationKey, ItemInstance, NormalizeOptions, PoolKey, RawAllocation,
    RawInstanceRecord, RawNamedRef, UNKNOWN_GROUP,
};
pub use search::SearchQuery;
