//! What the current editing session may draw from.

use std::collections::HashMap;

use handreceipt_core::InstanceId;
use handreceipt_inventory::{CatalogSnapshot, ItemInstance, PoolKey};

use crate::exclusivity::{OwnedInstanceSet, UsedInstanceSet};
use crate::receipt::ReceiptRecord;

/// Editable catalog plus the exclusivity sets derived for one edit target.
///
/// Replaced wholesale whenever the catalog, the receipt list or the edit
/// target changes; never patched in place.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Availability {
    catalog: CatalogSnapshot,
    used: UsedInstanceSet,
    owned: OwnedInstanceSet,
}

impl Availability {
    pub fn new(catalog: CatalogSnapshot, used: UsedInstanceSet, owned: OwnedInstanceSet) -> Self {
        Self {
            catalog,
            used,
            owned,
        }
    }

    /// Derive availability from a catalog and the open receipts.
    ///
    /// `editing` is the edited receipt as it was when editing began (absent
    /// in create mode). Its instances are exempt from the used set and folded
    /// into the catalog so they stay selectable even when the provider omits
    /// them; the provider's copy wins when both exist.
    pub fn from_receipts(
        catalog: &CatalogSnapshot,
        receipts: &[ReceiptRecord],
        editing: Option<&ReceiptRecord>,
    ) -> Self {
        let used = UsedInstanceSet::compute(receipts, editing.map(|r| r.id));
        let owned = OwnedInstanceSet::of(editing);
        let owned_items = editing.into_iter().flat_map(|r| r.items.iter().cloned());

        Self::new(catalog.including(owned_items), used, owned)
    }

    /// Editable-catalog copies of `receipt`'s instances, in receipt order.
    ///
    /// Seeding a buffer from these keeps every group keyed by the same pool
    /// that supply is counted under.
    pub fn owned_items<'a>(
        &'a self,
        receipt: &'a ReceiptRecord,
    ) -> impl Iterator<Item = &'a ItemInstance> + 'a {
        receipt
            .bound_instance_ids()
            .filter_map(|id| self.catalog.get(id))
    }

    pub fn catalog(&self) -> &CatalogSnapshot {
        &self.catalog
    }

    pub fn used(&self) -> &UsedInstanceSet {
        &self.used
    }

    pub fn owned(&self) -> &OwnedInstanceSet {
        &self.owned
    }

    /// Bound to another open receipt and not owned by the edited one.
    pub fn is_blocked(&self, id: InstanceId) -> bool {
        self.used.contains(id) && !self.owned.contains(id)
    }

    /// Ordinary, unblocked instances of `pool`, in catalog order.
    pub fn pool<'a>(&'a self, pool: &'a PoolKey) -> impl Iterator<Item = &'a ItemInstance> + 'a {
        self.catalog.iter().filter(move |i| {
            !i.is_report_required()
                && i.group() == pool.group
                && i.allocation_key() == pool.allocation
                && !self.is_blocked(i.id())
        })
    }

    /// Unused supply of one pool (including what a buffer may hold of it).
    pub fn supply(&self, pool: &PoolKey) -> usize {
        self.pool(pool).count()
    }

    /// Unused supply of every ordinary pool, in one catalog pass.
    pub fn supplies(&self) -> HashMap<PoolKey, usize> {
        let mut supplies = HashMap::new();
        for instance in self.catalog.iter() {
            if instance.is_report_required() || self.is_blocked(instance.id()) {
                continue;
            }
            *supplies.entry(instance.pool_key()).or_insert(0) += 1;
        }
        supplies
    }
}
