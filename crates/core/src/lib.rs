//! `handreceipt-core`: shared building blocks for the receipt composition engine.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns):
//! strongly-typed identifiers and the error taxonomy every layer reports with.

pub mod error;
pub mod id;

pub use error::{ReceiptError, ReceiptResult};
pub use id::{InstanceId, LocationId, ReceiptId, RecipientId, UnitId};
