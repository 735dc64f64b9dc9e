//! Exclusivity filter: which instances are already bound to other receipts.

use std::collections::{HashMap, HashSet};

use handreceipt_core::{InstanceId, ReceiptId};

use crate::receipt::ReceiptRecord;

/// Identities bound to any open receipt other than the one being edited.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedInstanceSet(HashSet<InstanceId>);

impl UsedInstanceSet {
    /// Union of bound identities of every receipt except `editing`.
    ///
    /// Pure; recompute whenever the receipt list or the edit target changes.
    pub fn compute(receipts: &[ReceiptRecord], editing: Option<ReceiptId>) -> Self {
        let mut owners: HashMap<InstanceId, ReceiptId> = HashMap::new();

        for receipt in receipts.iter().filter(|r| Some(r.id) != editing) {
            for id in receipt.bound_instance_ids() {
                if let Some(previous) = owners.insert(id, receipt.id) {
                    if previous != receipt.id {
                        tracing::warn!(
                            instance_id = %id,
                            first = %previous,
                            second = %receipt.id,
                            "instance bound to two open receipts"
                        );
                    }
                }
            }
        }

        Self(owners.into_keys().collect())
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<InstanceId> for UsedInstanceSet {
    fn from_iter<T: IntoIterator<Item = InstanceId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Identities the receipt under edit owned when editing began.
///
/// Empty in create mode.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OwnedInstanceSet(HashSet<InstanceId>);

impl OwnedInstanceSet {
    /// Identities of the edited receipt as it was when editing began.
    pub fn of(editing: Option<&ReceiptRecord>) -> Self {
        editing
            .into_iter()
            .flat_map(ReceiptRecord::bound_instance_ids)
            .collect()
    }

    pub fn contains(&self, id: InstanceId) -> bool {
        self.0.contains(&id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<InstanceId> for OwnedInstanceSet {
    fn from_iter<T: IntoIterator<Item = InstanceId>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}
