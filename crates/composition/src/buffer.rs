//! Composition buffer: the in-progress selection for one receipt.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};

use handreceipt_core::{InstanceId, ReceiptError, ReceiptResult};
use handreceipt_inventory::{CatalogSnapshot, ItemInstance, PoolKey};

use crate::availability::Availability;

/// One receipt line under composition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Entry {
    /// A report-required instance; never merged.
    Single(InstanceId),
    /// Ordinary instances of one pool. Most recently added last.
    Group {
        pool: PoolKey,
        instances: Vec<InstanceId>,
    },
}

impl Entry {
    pub fn instance_ids(&self) -> &[InstanceId] {
        match self {
            Entry::Single(id) => std::slice::from_ref(id),
            Entry::Group { instances, .. } => instances,
        }
    }

    pub fn count(&self) -> usize {
        self.instance_ids().len()
    }

    pub fn pool(&self) -> Option<&PoolKey> {
        match self {
            Entry::Single(_) => None,
            Entry::Group { pool, .. } => Some(pool),
        }
    }

    /// Whether `item`, as currently catalogued, belongs in this entry.
    fn holds(&self, item: &ItemInstance) -> bool {
        match self.pool() {
            None => item.is_report_required(),
            Some(pool) => !item.is_report_required() && item.pool_key() == *pool,
        }
    }
}

/// Display view of an entry, resolved against the catalog.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line<'a> {
    Single(&'a ItemInstance),
    Group { pool: &'a PoolKey, count: usize },
}

/// Ordered entries plus an identity → entry index.
///
/// Invariant: every identity appears in at most one entry, at most once.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CompositionBuffer {
    entries: Vec<Entry>,
    index: HashMap<InstanceId, usize>,
}

impl CompositionBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Update-mode buffer pre-populated with a receipt's bound instances.
    ///
    /// Pass the editable catalog's copies (`Availability::owned_items`) so
    /// groups land in the pools supply is counted under.
    pub fn seeded<'a>(items: impl IntoIterator<Item = &'a ItemInstance>) -> Self {
        let mut buffer = Self::new();
        for item in items {
            if buffer.contains(item.id()) {
                continue;
            }
            buffer.insert(item);
        }
        buffer
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.index.contains_key(&id)
    }

    /// Flat identity projection, in entry order.
    pub fn instance_ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.entries.iter().flat_map(|e| e.instance_ids().iter().copied())
    }

    pub fn total_instances(&self) -> usize {
        self.index.len()
    }

    /// How many instances of `pool` the buffer reserves.
    pub fn reserved(&self, pool: &PoolKey) -> usize {
        self.group_position(pool)
            .map(|pos| self.entries[pos].count())
            .unwrap_or(0)
    }

    /// Select one instance.
    ///
    /// Fails with `DuplicateSelection` when it is already selected or bound to
    /// another open receipt, `UnknownInstance` when the editable catalog does
    /// not know it. Nothing changes on failure.
    pub fn add_instance(&mut self, id: InstanceId, availability: &Availability) -> ReceiptResult<()> {
        if self.contains(id) || availability.is_blocked(id) {
            tracing::debug!(instance_id = %id, "duplicate selection rejected");
            return Err(ReceiptError::DuplicateSelection(id));
        }
        let instance = availability
            .catalog()
            .get(id)
            .ok_or(ReceiptError::UnknownInstance(id))?;

        self.insert(instance);
        tracing::debug!(instance_id = %id, group = instance.group(), "instance added");
        Ok(())
    }

    /// Remove the entry holding `id`.
    ///
    /// Report-required entries go one by one; for ordinary instances the whole
    /// merged entry is removed. Returns `None` if `id` is not selected.
    pub fn remove_instance(&mut self, id: InstanceId) -> Option<Entry> {
        let pos = *self.index.get(&id)?;
        let removed = self.entries.remove(pos);
        self.reindex();
        tracing::debug!(instance_id = %id, released = removed.count(), "entry removed");
        Some(removed)
    }

    /// Drop identities that are no longer selectable under `availability`
    /// (claimed by another receipt or gone from the catalog). Groups keep
    /// their remaining identities in order; emptied entries disappear.
    ///
    /// Identities whose catalog copy moved to another pool (or changed
    /// tracking mode) stay selected and are regrouped under their current
    /// pool. Only dropped identities are returned.
    pub fn retain_available(&mut self, availability: &Availability) -> Vec<InstanceId> {
        let mut released = Vec::new();
        let mut moved = Vec::new();

        for entry in &self.entries {
            for &id in entry.instance_ids() {
                let current = availability
                    .catalog()
                    .get(id)
                    .filter(|_| !availability.is_blocked(id));
                match current {
                    None => released.push(id),
                    Some(item) if !entry.holds(item) => moved.push(id),
                    Some(_) => {}
                }
            }
        }

        if released.is_empty() && moved.is_empty() {
            return released;
        }

        let gone: HashSet<InstanceId> = released.iter().chain(&moved).copied().collect();
        for entry in &mut self.entries {
            if let Entry::Group { instances, .. } = entry {
                instances.retain(|id| !gone.contains(id));
            }
        }
        self.entries.retain(|entry| match entry {
            Entry::Single(id) => !gone.contains(id),
            Entry::Group { instances, .. } => !instances.is_empty(),
        });
        self.reindex();

        for id in &moved {
            if let Some(item) = availability.catalog().get(*id) {
                self.insert(item);
            }
        }

        if !moved.is_empty() {
            tracing::debug!(moved = moved.len(), "selection regrouped after catalog change");
        }
        if !released.is_empty() {
            tracing::warn!(released = released.len(), "selection no longer available");
        }
        released
    }

    /// Resolve entries for display. Entries whose instance is missing from
    /// `catalog` are skipped.
    pub fn lines<'a>(&'a self, catalog: &'a CatalogSnapshot) -> Vec<Line<'a>> {
        self.entries
            .iter()
            .filter_map(|entry| match entry {
                Entry::Single(id) => catalog.get(*id).map(Line::Single),
                Entry::Group { pool, instances } => Some(Line::Group {
                    pool,
                    count: instances.len(),
                }),
            })
            .collect()
    }

    fn insert(&mut self, instance: &ItemInstance) {
        let id = instance.id();
        if instance.is_report_required() {
            self.index.insert(id, self.entries.len());
            self.entries.push(Entry::Single(id));
        } else {
            self.push_to_group(&instance.pool_key(), id);
        }
    }

    pub(crate) fn group_position(&self, pool: &PoolKey) -> Option<usize> {
        self.entries.iter().position(|e| e.pool() == Some(pool))
    }

    pub(crate) fn push_to_group(&mut self, pool: &PoolKey, id: InstanceId) {
        let pos = match self.group_position(pool) {
            Some(pos) => pos,
            None => {
                self.entries.push(Entry::Group {
                    pool: pool.clone(),
                    instances: Vec::new(),
                });
                self.entries.len() - 1
            }
        };
        if let Entry::Group { instances, .. } = &mut self.entries[pos] {
            instances.push(id);
            self.index.insert(id, pos);
        }
    }

    /// Pop the most recently added instance of `pool`; drops the entry once
    /// it is empty.
    pub(crate) fn pop_from_group(&mut self, pool: &PoolKey) -> Option<InstanceId> {
        let pos = self.group_position(pool)?;
        let Entry::Group { instances, .. } = &mut self.entries[pos] else {
            return None;
        };
        let id = instances.pop()?;
        self.index.remove(&id);
        if instances.is_empty() {
            self.entries.remove(pos);
            self.reindex();
        }
        Some(id)
    }

    fn reindex(&mut self) {
        self.index.clear();
        for (pos, entry) in self.entries.iter().enumerate() {
            for id in entry.instance_ids() {
                self.index.insert(*id, pos);
            }
        }
    }
}
