//! Infrastructure layer: provider contracts, in-memory providers, config and
//! the editing session that wires the composition engine to them.

pub mod config;
pub mod editor;
pub mod providers;

mod integration_tests;

pub use config::{EditorConfig, LogFormat};
pub use editor::{CompletionSink, LoadReport, NoopSink, ReceiptEditor};
pub use providers::{
    CatalogProvider, InMemoryCatalog, InMemoryDirectory, InMemoryReceiptStore, ProviderError,
    Providers, ReceiptProvider, RecipientDirectory,
};
