//! External collaborator boundary.
//!
//! The engine never talks to storage or transport itself; it consumes these
//! contracts. Implementations own timeouts and retries of their transport,
//! and the receipt provider is the authority on exclusivity: it must reject a
//! submission that binds an instance already bound elsewhere.

pub mod in_memory;

use std::sync::Arc;

use thiserror::Error;

use handreceipt_composition::{ReceiptRecord, Recipient};
use handreceipt_core::{InstanceId, ReceiptError, ReceiptId, RecipientId};
use handreceipt_inventory::RawInstanceRecord;

pub use in_memory::{InMemoryCatalog, InMemoryDirectory, InMemoryReceiptStore};

/// Provider operation error.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// The authoritative store rejected a write (e.g. instance already bound).
    #[error("conflict: {0}")]
    Conflict(String),

    /// The provider could not be reached or failed to answer.
    #[error("unavailable: {0}")]
    Unavailable(String),
}

impl From<ProviderError> for ReceiptError {
    fn from(value: ProviderError) -> Self {
        match value {
            ProviderError::Conflict(msg) => ReceiptError::ConflictOnSubmit(msg),
            ProviderError::Unavailable(msg) => ReceiptError::TransientFetchError(msg),
        }
    }
}

/// Source of the eventually-consistent inventory snapshot.
#[async_trait::async_trait]
pub trait CatalogProvider: Send + Sync {
    async fn fetch_available(&self) -> Result<Vec<RawInstanceRecord>, ProviderError>;
}

/// Open receipts and their persistence.
#[async_trait::async_trait]
pub trait ReceiptProvider: Send + Sync {
    async fn fetch_all(&self) -> Result<Vec<ReceiptRecord>, ProviderError>;

    async fn create(
        &self,
        recipient_id: RecipientId,
        instance_ids: Vec<InstanceId>,
    ) -> Result<ReceiptRecord, ProviderError>;

    async fn update(
        &self,
        receipt_id: ReceiptId,
        recipient_id: RecipientId,
        instance_ids: Vec<InstanceId>,
    ) -> Result<ReceiptRecord, ProviderError>;
}

/// People receipts can be signed for.
#[async_trait::async_trait]
pub trait RecipientDirectory: Send + Sync {
    async fn list(&self) -> Result<Vec<Recipient>, ProviderError>;
}

#[async_trait::async_trait]
impl<P> CatalogProvider for Arc<P>
where
    P: CatalogProvider + ?Sized,
{
    async fn fetch_available(&self) -> Result<Vec<RawInstanceRecord>, ProviderError> {
        (**self).fetch_available().await
    }
}

#[async_trait::async_trait]
impl<P> ReceiptProvider for Arc<P>
where
    P: ReceiptProvider + ?Sized,
{
    async fn fetch_all(&self) -> Result<Vec<ReceiptRecord>, ProviderError> {
        (**self).fetch_all().await
    }

    async fn create(
        &self,
        recipient_id: RecipientId,
        instance_ids: Vec<InstanceId>,
    ) -> Result<ReceiptRecord, ProviderError> {
        (**self).create(recipient_id, instance_ids).await
    }

    async fn update(
        &self,
        receipt_id: ReceiptId,
        recipient_id: RecipientId,
        instance_ids: Vec<InstanceId>,
    ) -> Result<ReceiptRecord, ProviderError> {
        (**self).update(receipt_id, recipient_id, instance_ids).await
    }
}

#[async_trait::async_trait]
impl<P> RecipientDirectory for Arc<P>
where
    P: RecipientDirectory + ?Sized,
{
    async fn list(&self) -> Result<Vec<Recipient>, ProviderError> {
        (**self).list().await
    }
}

/// The three collaborators an editing session needs.
#[derive(Debug, Clone)]
pub struct Providers<C, R, D> {
    pub catalog: C,
    pub receipts: R,
    pub directory: D,
}

impl<C, R, D> Providers<C, R, D> {
    pub fn new(catalog: C, receipts: R, directory: D) -> Self {
        Self {
            catalog,
            receipts,
            directory,
        }
    }
}
