//! Receipt composition engine.
//!
//! Decides which item instances can be assigned right now, keeps one physical
//! item from being committed to two receipts, and reconciles serialized items
//! with fungible quantity pools inside one editable selection. Implemented
//! purely as deterministic domain logic (no IO, no storage).
//!
//! ```text
//! CatalogSnapshot + UsedInstanceSet ─→ Availability ─→ candidates::resolve
//!                                            │
//!                              CompositionBuffer ⇄ set_quantity
//!                                            │
//!                                  submission::assemble ─→ Submission
//! ```

pub mod availability;
pub mod buffer;
pub mod candidates;
pub mod exclusivity;
pub mod receipt;
pub mod reconcile;
pub mod submission;

pub use availability::Availability;
pub use buffer::{CompositionBuffer, Entry, Line};
pub use candidates::{Candidate, CandidateQuery, GroupSummary};
pub use exclusivity::{OwnedInstanceSet, UsedInstanceSet};
pub use receipt::{ReceiptRecord, Recipient};
pub use reconcile::QuantityChange;
pub use submission::{Submission, SubmitTarget};
