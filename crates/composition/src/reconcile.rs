//! Quantity reconciler: turns a requested pool quantity into concrete picks.

use handreceipt_core::{InstanceId, ReceiptError, ReceiptResult};
use handreceipt_inventory::PoolKey;

use crate::availability::Availability;
use crate::buffer::CompositionBuffer;

/// Identities touched by one `set_quantity` call.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QuantityChange {
    pub added: Vec<InstanceId>,
    /// Most recently added first.
    pub released: Vec<InstanceId>,
}

impl QuantityChange {
    pub fn is_noop(&self) -> bool {
        self.added.is_empty() && self.released.is_empty()
    }
}

impl CompositionBuffer {
    /// Bring the buffer's count for `pool` to `desired`.
    ///
    /// Growing draws unused, unselected ordinary instances in catalog order and
    /// fails with `InsufficientInventory` (buffer untouched) when the pool runs
    /// short. Shrinking releases the most recently added instances first.
    pub fn set_quantity(
        &mut self,
        pool: &PoolKey,
        desired: usize,
        availability: &Availability,
    ) -> ReceiptResult<QuantityChange> {
        let current = self.reserved(pool);

        if desired > current {
            let needed = desired - current;
            let drawn: Vec<InstanceId> = availability
                .pool(pool)
                .map(|i| i.id())
                .filter(|id| !self.contains(*id))
                .take(needed)
                .collect();

            if drawn.len() < needed {
                tracing::debug!(%pool, desired, available = current + drawn.len(), "quantity rejected");
                return Err(ReceiptError::insufficient(desired, current + drawn.len()));
            }

            for id in &drawn {
                self.push_to_group(pool, *id);
            }
            tracing::debug!(%pool, from = current, to = desired, "quantity increased");
            return Ok(QuantityChange {
                added: drawn,
                released: Vec::new(),
            });
        }

        let mut released = Vec::with_capacity(current - desired);
        while self.reserved(pool) > desired {
            match self.pop_from_group(pool) {
                Some(id) => released.push(id),
                None => break,
            }
        }
        if !released.is_empty() {
            tracing::debug!(%pool, from = current, to = desired, "quantity decreased");
        }

        Ok(QuantityChange {
            added: Vec::new(),
            released,
        })
    }
}
