use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use handreceipt_core::{InstanceId, ReceiptId, RecipientId};
use handreceipt_inventory::{AllocationKey, ItemInstance};

/// An open receipt as reported by the receipt provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptRecord {
    pub id: ReceiptId,
    pub recipient_id: RecipientId,
    /// Instances bound to this receipt, in receipt order.
    pub items: Vec<ItemInstance>,
    pub created_at: DateTime<Utc>,
}

impl ReceiptRecord {
    pub fn bound_instance_ids(&self) -> impl Iterator<Item = InstanceId> + '_ {
        self.items.iter().map(ItemInstance::id)
    }
}

/// Someone a receipt can be signed for.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub id: RecipientId,
    pub name: String,
    /// Where the recipient normally draws equipment from (ranking hint).
    pub home_allocation: Option<AllocationKey>,
}
