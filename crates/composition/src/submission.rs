//! Submission assembler: flattens the buffer into what gets persisted.

use serde::{Deserialize, Serialize};

use handreceipt_core::{InstanceId, ReceiptError, ReceiptId, ReceiptResult, RecipientId};

use crate::availability::Availability;
use crate::buffer::CompositionBuffer;
use crate::receipt::Recipient;

/// Whether the submission creates a receipt or replaces an existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase", tag = "mode", content = "receipt_id")]
pub enum SubmitTarget {
    Create,
    Update(ReceiptId),
}

/// Payload handed to the persistence collaborator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub target: SubmitTarget,
    pub recipient_id: RecipientId,
    pub instance_ids: Vec<InstanceId>,
}

/// Flat identity list: one per serialized entry, then each group's recorded
/// identities, in entry order.
pub fn flatten(buffer: &CompositionBuffer) -> Vec<InstanceId> {
    buffer.instance_ids().collect()
}

/// Validate and build the submission.
///
/// Checks run before any provider call: a known recipient must be chosen
/// (`InvalidRecipient`), the buffer must not be empty (`EmptyComposition`),
/// and every identity must belong to the editable catalog
/// (`UnknownInstance`). The buffer is only read.
pub fn assemble(
    target: SubmitTarget,
    recipient: Option<RecipientId>,
    recipients: &[Recipient],
    buffer: &CompositionBuffer,
    availability: &Availability,
) -> ReceiptResult<Submission> {
    let recipient_id = recipient
        .filter(|id| recipients.iter().any(|r| r.id == *id))
        .ok_or(ReceiptError::InvalidRecipient)?;

    if buffer.is_empty() {
        return Err(ReceiptError::EmptyComposition);
    }

    let instance_ids = flatten(buffer);
    if let Some(unknown) = instance_ids
        .iter()
        .find(|id| !availability.catalog().contains(**id))
    {
        return Err(ReceiptError::UnknownInstance(*unknown));
    }

    Ok(Submission {
        target,
        recipient_id,
        instance_ids,
    })
}
