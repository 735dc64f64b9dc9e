//! In-memory providers for tests/dev. Not optimized for performance.
//!
//! `InMemoryReceiptStore` behaves like the authoritative persistence layer:
//! it refuses to bind an instance that another open receipt already holds.

use std::collections::HashSet;
use std::sync::Arc;
use std::sync::RwLock;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use chrono::Utc;

use handreceipt_composition::{ReceiptRecord, Recipient};
use handreceipt_core::{InstanceId, ReceiptId, RecipientId};
use handreceipt_inventory::{ItemInstance, NormalizeOptions, RawInstanceRecord};

use super::{CatalogProvider, ProviderError, ReceiptProvider, RecipientDirectory};

fn poisoned() -> ProviderError {
    ProviderError::Unavailable("lock poisoned".to_string())
}

/// Consume a pending injected failure.
fn take_failure(flag: &AtomicBool, what: &str) -> Result<(), ProviderError> {
    if flag.swap(false, Ordering::SeqCst) {
        return Err(ProviderError::Unavailable(format!("{what} temporarily unavailable")));
    }
    Ok(())
}

fn record_id(record: &RawInstanceRecord) -> Option<InstanceId> {
    record.id.as_deref().and_then(|s| s.parse().ok())
}

/// Catalog feed backed by a vector of raw records.
#[derive(Debug, Default)]
pub struct InMemoryCatalog {
    records: RwLock<Vec<RawInstanceRecord>>,
    fail_next: AtomicBool,
    fetches: AtomicUsize,
}

impl InMemoryCatalog {
    pub fn new(records: Vec<RawInstanceRecord>) -> Self {
        Self {
            records: RwLock::new(records),
            ..Self::default()
        }
    }

    /// Load a JSON array of provider records.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        Ok(Self::new(serde_json::from_str(json)?))
    }

    pub fn replace(&self, records: Vec<RawInstanceRecord>) -> Result<(), ProviderError> {
        *self.records.write().map_err(|_| poisoned())? = records;
        Ok(())
    }

    pub fn push(&self, record: RawInstanceRecord) -> Result<(), ProviderError> {
        self.records.write().map_err(|_| poisoned())?.push(record);
        Ok(())
    }

    /// Look up one record by identity.
    pub fn record(&self, id: InstanceId) -> Option<RawInstanceRecord> {
        let records = self.records.read().ok()?;
        records.iter().find(|r| record_id(r) == Some(id)).cloned()
    }

    /// Make the next `fetch_available` fail with `Unavailable`.
    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl CatalogProvider for InMemoryCatalog {
    async fn fetch_available(&self) -> Result<Vec<RawInstanceRecord>, ProviderError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        take_failure(&self.fail_next, "catalog")?;
        let records = self.records.read().map_err(|_| poisoned())?;
        Ok(records.clone())
    }
}

/// Receipt store that resolves identities against an `InMemoryCatalog`.
#[derive(Debug)]
pub struct InMemoryReceiptStore {
    catalog: Arc<InMemoryCatalog>,
    options: NormalizeOptions,
    receipts: RwLock<Vec<ReceiptRecord>>,
    fail_next: AtomicBool,
    writes: AtomicUsize,
}

impl InMemoryReceiptStore {
    pub fn new(catalog: Arc<InMemoryCatalog>) -> Self {
        Self {
            catalog,
            options: NormalizeOptions::default(),
            receipts: RwLock::new(Vec::new()),
            fail_next: AtomicBool::new(false),
            writes: AtomicUsize::new(0),
        }
    }

    pub fn with_normalize_options(mut self, options: NormalizeOptions) -> Self {
        self.options = options;
        self
    }

    /// Open a receipt directly (fixture setup); not counted as a write call.
    pub fn open(
        &self,
        recipient_id: RecipientId,
        instance_ids: &[InstanceId],
    ) -> Result<ReceiptRecord, ProviderError> {
        let mut receipts = self.receipts.write().map_err(|_| poisoned())?;
        let items = self.bind(&receipts, None, instance_ids)?;
        let receipt = ReceiptRecord {
            id: ReceiptId::new(),
            recipient_id,
            items,
            created_at: Utc::now(),
        };
        receipts.push(receipt.clone());
        Ok(receipt)
    }

    /// Finalize (remove) an open receipt, releasing its instances.
    pub fn close(&self, receipt_id: ReceiptId) -> Result<bool, ProviderError> {
        let mut receipts = self.receipts.write().map_err(|_| poisoned())?;
        let before = receipts.len();
        receipts.retain(|r| r.id != receipt_id);
        Ok(receipts.len() != before)
    }

    pub fn get(&self, receipt_id: ReceiptId) -> Option<ReceiptRecord> {
        let receipts = self.receipts.read().ok()?;
        receipts.iter().find(|r| r.id == receipt_id).cloned()
    }

    pub fn receipts(&self) -> Vec<ReceiptRecord> {
        self.receipts.read().map(|r| r.clone()).unwrap_or_default()
    }

    /// Number of `create`/`update` calls received, accepted or not.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    /// Make the next `fetch_all` fail with `Unavailable`.
    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    /// Resolve `instance_ids` into items, enforcing exclusivity against every
    /// open receipt except `editing`.
    fn bind(
        &self,
        receipts: &[ReceiptRecord],
        editing: Option<&ReceiptRecord>,
        instance_ids: &[InstanceId],
    ) -> Result<Vec<ItemInstance>, ProviderError> {
        let editing_id = editing.map(|r| r.id);
        let mut seen = HashSet::new();
        let mut items = Vec::with_capacity(instance_ids.len());

        for &id in instance_ids {
            if !seen.insert(id) {
                return Err(ProviderError::Conflict(format!("instance {id} listed twice")));
            }

            if let Some(owner) = receipts
                .iter()
                .filter(|r| Some(r.id) != editing_id)
                .find(|r| r.bound_instance_ids().any(|bound| bound == id))
            {
                return Err(ProviderError::Conflict(format!(
                    "instance {id} is already bound to receipt {}",
                    owner.id
                )));
            }

            let item = editing
                .and_then(|r| r.items.iter().find(|i| i.id() == id).cloned())
                .or_else(|| {
                    self.catalog
                        .record(id)
                        .and_then(|raw| ItemInstance::normalize(&raw, &self.options))
                })
                .ok_or_else(|| ProviderError::Conflict(format!("instance {id} does not exist")))?;
            items.push(item);
        }

        Ok(items)
    }
}

#[async_trait::async_trait]
impl ReceiptProvider for InMemoryReceiptStore {
    async fn fetch_all(&self) -> Result<Vec<ReceiptRecord>, ProviderError> {
        take_failure(&self.fail_next, "receipts")?;
        let receipts = self.receipts.read().map_err(|_| poisoned())?;
        Ok(receipts.clone())
    }

    async fn create(
        &self,
        recipient_id: RecipientId,
        instance_ids: Vec<InstanceId>,
    ) -> Result<ReceiptRecord, ProviderError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut receipts = self.receipts.write().map_err(|_| poisoned())?;
        let items = self.bind(&receipts, None, &instance_ids)?;

        let receipt = ReceiptRecord {
            id: ReceiptId::new(),
            recipient_id,
            items,
            created_at: Utc::now(),
        };
        receipts.push(receipt.clone());
        Ok(receipt)
    }

    async fn update(
        &self,
        receipt_id: ReceiptId,
        recipient_id: RecipientId,
        instance_ids: Vec<InstanceId>,
    ) -> Result<ReceiptRecord, ProviderError> {
        self.writes.fetch_add(1, Ordering::SeqCst);
        let mut receipts = self.receipts.write().map_err(|_| poisoned())?;
        let pos = receipts
            .iter()
            .position(|r| r.id == receipt_id)
            .ok_or_else(|| ProviderError::Conflict(format!("receipt {receipt_id} is not open")))?;

        let items = self.bind(&receipts, Some(&receipts[pos]), &instance_ids)?;
        let receipt = &mut receipts[pos];
        receipt.recipient_id = recipient_id;
        receipt.items = items;
        Ok(receipt.clone())
    }
}

/// Recipient directory backed by a vector.
#[derive(Debug, Default)]
pub struct InMemoryDirectory {
    recipients: RwLock<Vec<Recipient>>,
    fail_next: AtomicBool,
}

impl InMemoryDirectory {
    pub fn new(recipients: Vec<Recipient>) -> Self {
        Self {
            recipients: RwLock::new(recipients),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn push(&self, recipient: Recipient) -> Result<(), ProviderError> {
        self.recipients.write().map_err(|_| poisoned())?.push(recipient);
        Ok(())
    }

    /// Make the next `list` fail with `Unavailable`.
    pub fn fail_next_fetch(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait::async_trait]
impl RecipientDirectory for InMemoryDirectory {
    async fn list(&self) -> Result<Vec<Recipient>, ProviderError> {
        take_failure(&self.fail_next, "recipient directory")?;
        let recipients = self.recipients.read().map_err(|_| poisoned())?;
        Ok(recipients.clone())
    }
}
