//! Immutable, point-in-time catalog view.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use handreceipt_core::InstanceId;

use crate::instance::{ItemInstance, NormalizeOptions, RawInstanceRecord};

/// Snapshot of the item instances known to the external inventory system.
///
/// Instances keep provider order; a snapshot is never mutated, a newer fetch
/// replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogSnapshot {
    instances: Vec<ItemInstance>,
    index: HashMap<InstanceId, usize>,
    fetched_at: DateTime<Utc>,
}

impl CatalogSnapshot {
    pub fn empty() -> Self {
        Self::new(Vec::new(), Utc::now())
    }

    /// Build a snapshot from normalized instances. Duplicate identities keep
    /// their first occurrence.
    pub fn new(instances: impl IntoIterator<Item = ItemInstance>, fetched_at: DateTime<Utc>) -> Self {
        let mut snapshot = Self {
            instances: Vec::new(),
            index: HashMap::new(),
            fetched_at,
        };
        snapshot.extend(instances);
        snapshot
    }

    /// Ingest provider records. Records that cannot be normalized are skipped.
    pub fn from_records(
        records: impl IntoIterator<Item = RawInstanceRecord>,
        options: &NormalizeOptions,
        fetched_at: DateTime<Utc>,
    ) -> Self {
        let mut skipped = 0usize;
        let instances: Vec<ItemInstance> = records
            .into_iter()
            .filter_map(|raw| {
                let normalized = ItemInstance::normalize(&raw, options);
                if normalized.is_none() {
                    skipped += 1;
                }
                normalized
            })
            .collect();

        if skipped > 0 {
            tracing::warn!(skipped, "skipped catalog records without a usable identity");
        }

        Self::new(instances, fetched_at)
    }

    /// A new snapshot that also contains `extra` (appended after the current
    /// instances, duplicates ignored).
    pub fn including(&self, extra: impl IntoIterator<Item = ItemInstance>) -> Self {
        let mut snapshot = self.clone();
        snapshot.extend(extra);
        snapshot
    }

    fn extend(&mut self, instances: impl IntoIterator<Item = ItemInstance>) {
        for instance in instances {
            if self.index.contains_key(&instance.id()) {
                tracing::debug!(instance_id = %instance.id(), "duplicate catalog identity ignored");
                continue;
            }
            self.index.insert(instance.id(), self.instances.len());
            self.instances.push(instance);
        }
    }

    pub fn get(&self, id: InstanceId) -> Option<&ItemInstance> {
        self.index.get(&id).map(|&pos| &self.instances[pos])
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.index.contains_key(&id)
    }

    /// Provider position of `id`; used as a stable tie-breaker.
    pub fn position(&self, id: InstanceId) -> Option<usize> {
        self.index.get(&id).copied()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ItemInstance> {
        self.instances.iter()
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }
}

impl Default for CatalogSnapshot {
    fn default() -> Self {
        Self::empty()
    }
}
