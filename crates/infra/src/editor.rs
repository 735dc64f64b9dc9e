//! Editing session orchestration.
//!
//! `ReceiptEditor` wires the pure composition engine to the external
//! collaborators for one create or update session:
//!
//! ```text
//! load() ──→ fetch catalog ─┐
//!            fetch receipts ─┼─→ replace snapshots in one assignment
//!            fetch recipients┘          │
//!                                       ↓
//!        add / remove / set_quantity ─→ CompositionBuffer
//!                                       │
//! submit() ─→ assemble (local checks) ─→ create | update ─→ CompletionSink
//! ```
//!
//! Provider calls are awaited before any state is touched, so a failed fetch
//! or a rejected submission leaves the session exactly as it was. There is no
//! client-side lock: the receipt provider decides conflicts and the editor
//! surfaces them as `ConflictOnSubmit` without retrying.

use chrono::Utc;

use handreceipt_composition::candidates::{self, Candidate, CandidateQuery, GroupSummary};
use handreceipt_composition::submission::assemble;
use handreceipt_composition::{
    Availability, CompositionBuffer, Line, QuantityChange, ReceiptRecord, Recipient, SubmitTarget,
};
use handreceipt_core::{InstanceId, ReceiptError, ReceiptId, ReceiptResult, RecipientId};
use handreceipt_inventory::{AllocationKey, CatalogSnapshot, PoolKey};

use crate::config::EditorConfig;
use crate::providers::{CatalogProvider, ProviderError, Providers, ReceiptProvider, RecipientDirectory};

/// Completion signals delivered to the surrounding application.
pub trait CompletionSink: Send + Sync {
    /// The receipt was persisted; the session is closed.
    fn on_success(&self, receipt: &ReceiptRecord);

    /// The session was abandoned without persisting anything.
    fn on_cancel(&self);
}

/// Sink that ignores every signal.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopSink;

impl CompletionSink for NoopSink {
    fn on_success(&self, _receipt: &ReceiptRecord) {}

    fn on_cancel(&self) {}
}

/// Outcome of a load or refresh.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoadReport {
    pub catalog_size: usize,
    pub open_receipts: usize,
    /// Selected instances dropped because they are no longer available.
    pub released: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Loading,
    Ready,
    Closed,
}

fn fetch_failed(source: &'static str) -> impl Fn(ProviderError) -> ReceiptError {
    move |err| {
        tracing::warn!(source, error = %err, "fetch failed");
        match err {
            ProviderError::Unavailable(msg) | ProviderError::Conflict(msg) => {
                ReceiptError::fetch(format!("{source}: {msg}"))
            }
        }
    }
}

/// One receipt editing session.
///
/// The session starts in a loading phase (every mutating call fails with
/// `NotReady`), becomes ready after the first successful `load`, and closes
/// on successful submission or cancel.
pub struct ReceiptEditor<C, R, D> {
    providers: Providers<C, R, D>,
    sink: Box<dyn CompletionSink>,
    config: EditorConfig,
    target: SubmitTarget,
    /// Provider catalog as last fetched (without owned instances folded in).
    catalog: CatalogSnapshot,
    receipts: Vec<ReceiptRecord>,
    recipients: Vec<Recipient>,
    /// The edited receipt as it was when editing began.
    original: Option<ReceiptRecord>,
    availability: Availability,
    buffer: CompositionBuffer,
    recipient: Option<RecipientId>,
    phase: Phase,
}

impl<C, R, D> ReceiptEditor<C, R, D>
where
    C: CatalogProvider,
    R: ReceiptProvider,
    D: RecipientDirectory,
{
    /// Session composing a new receipt.
    pub fn create(providers: Providers<C, R, D>, config: EditorConfig) -> Self {
        Self::with_target(providers, config, SubmitTarget::Create)
    }

    /// Session editing an existing open receipt.
    pub fn edit(providers: Providers<C, R, D>, config: EditorConfig, receipt_id: ReceiptId) -> Self {
        Self::with_target(providers, config, SubmitTarget::Update(receipt_id))
    }

    fn with_target(providers: Providers<C, R, D>, config: EditorConfig, target: SubmitTarget) -> Self {
        Self {
            providers,
            sink: Box::new(NoopSink),
            config,
            target,
            catalog: CatalogSnapshot::empty(),
            receipts: Vec::new(),
            recipients: Vec::new(),
            original: None,
            availability: Availability::default(),
            buffer: CompositionBuffer::new(),
            recipient: None,
            phase: Phase::Loading,
        }
    }

    pub fn with_sink(mut self, sink: impl CompletionSink + 'static) -> Self {
        self.sink = Box::new(sink);
        self
    }

    pub fn target(&self) -> SubmitTarget {
        self.target
    }

    /// Receipt under edit (update mode only).
    pub fn editing(&self) -> Option<ReceiptId> {
        match self.target {
            SubmitTarget::Create => None,
            SubmitTarget::Update(id) => Some(id),
        }
    }

    pub fn is_ready(&self) -> bool {
        self.phase == Phase::Ready
    }

    pub fn is_closed(&self) -> bool {
        self.phase == Phase::Closed
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn availability(&self) -> &Availability {
        &self.availability
    }

    pub fn buffer(&self) -> &CompositionBuffer {
        &self.buffer
    }

    pub fn receipts(&self) -> &[ReceiptRecord] {
        &self.receipts
    }

    pub fn recipients(&self) -> &[Recipient] {
        &self.recipients
    }

    pub fn recipient(&self) -> Option<&Recipient> {
        let id = self.recipient?;
        self.recipients.iter().find(|r| r.id == id)
    }

    /// Ranking hint taken from the chosen recipient.
    pub fn home_allocation(&self) -> Option<AllocationKey> {
        self.recipient().and_then(|r| r.home_allocation)
    }

    fn ensure_open(&self) -> ReceiptResult<()> {
        if self.phase == Phase::Closed {
            return Err(ReceiptError::NotReady);
        }
        Ok(())
    }

    fn ensure_ready(&self) -> ReceiptResult<()> {
        if self.phase != Phase::Ready {
            return Err(ReceiptError::NotReady);
        }
        Ok(())
    }

    /// Fetch catalog, receipts and recipients, then replace every snapshot.
    ///
    /// On the first load in update mode the buffer is seeded from the edited
    /// receipt and its recipient preselected. Any failure leaves the session
    /// untouched.
    pub async fn load(&mut self) -> ReceiptResult<LoadReport> {
        self.ensure_open()?;

        let records = self
            .providers
            .catalog
            .fetch_available()
            .await
            .map_err(fetch_failed("catalog"))?;
        let receipts = self
            .providers
            .receipts
            .fetch_all()
            .await
            .map_err(fetch_failed("receipts"))?;
        let recipients = self
            .providers
            .directory
            .list()
            .await
            .map_err(fetch_failed("recipients"))?;

        let first_load = self.phase == Phase::Loading;
        let original = match (self.editing(), first_load) {
            (Some(id), true) => {
                let receipt = receipts.iter().find(|r| r.id == id).cloned().ok_or_else(|| {
                    tracing::warn!(receipt_id = %id, "edited receipt not found");
                    ReceiptError::fetch(format!("receipt {id} not found"))
                })?;
                Some(receipt)
            }
            _ => self.original.clone(),
        };

        let catalog = CatalogSnapshot::from_records(records, &self.config.normalize_options(), Utc::now());
        let availability = Availability::from_receipts(&catalog, &receipts, original.as_ref());

        let released = if first_load {
            if let Some(receipt) = &original {
                self.buffer = CompositionBuffer::seeded(availability.owned_items(receipt));
                self.recipient = Some(receipt.recipient_id);
            }
            0
        } else {
            self.buffer.retain_available(&availability).len()
        };

        self.catalog = catalog;
        self.receipts = receipts;
        self.recipients = recipients;
        self.original = original;
        self.availability = availability;
        self.phase = Phase::Ready;

        let report = self.report(released);
        tracing::info!(
            catalog_size = report.catalog_size,
            open_receipts = report.open_receipts,
            recipients = self.recipients.len(),
            editing = ?self.editing(),
            "editor loaded"
        );
        Ok(report)
    }

    /// Replace the catalog snapshot only. Selections that left the catalog
    /// are dropped from the buffer.
    pub async fn refresh_catalog(&mut self) -> ReceiptResult<LoadReport> {
        self.ensure_ready()?;
        let records = self
            .providers
            .catalog
            .fetch_available()
            .await
            .map_err(fetch_failed("catalog"))?;

        let catalog = CatalogSnapshot::from_records(records, &self.config.normalize_options(), Utc::now());
        let availability = Availability::from_receipts(&catalog, &self.receipts, self.original.as_ref());
        let released = self.buffer.retain_available(&availability).len();

        self.catalog = catalog;
        self.availability = availability;

        let report = self.report(released);
        tracing::info!(catalog_size = report.catalog_size, released, "catalog refreshed");
        Ok(report)
    }

    /// Replace the open-receipt list only. Selections now claimed by another
    /// receipt are dropped from the buffer.
    pub async fn refresh_receipts(&mut self) -> ReceiptResult<LoadReport> {
        self.ensure_ready()?;
        let receipts = self
            .providers
            .receipts
            .fetch_all()
            .await
            .map_err(fetch_failed("receipts"))?;

        let availability = Availability::from_receipts(&self.catalog, &receipts, self.original.as_ref());
        let released = self.buffer.retain_available(&availability).len();

        self.receipts = receipts;
        self.availability = availability;

        let report = self.report(released);
        tracing::info!(open_receipts = report.open_receipts, released, "receipts refreshed");
        Ok(report)
    }

    fn report(&self, released: usize) -> LoadReport {
        LoadReport {
            catalog_size: self.availability.catalog().len(),
            open_receipts: self.receipts.len(),
            released,
        }
    }

    /// Choose who signs for the receipt. Unknown recipients are rejected.
    pub fn select_recipient(&mut self, id: RecipientId) -> ReceiptResult<()> {
        self.ensure_ready()?;
        if !self.recipients.iter().any(|r| r.id == id) {
            return Err(ReceiptError::InvalidRecipient);
        }
        self.recipient = Some(id);
        tracing::debug!(recipient_id = %id, "recipient selected");
        Ok(())
    }

    pub fn clear_recipient(&mut self) {
        self.recipient = None;
    }

    fn query(&self, text: Option<&str>) -> CandidateQuery {
        let query = CandidateQuery::new()
            .with_home(self.home_allocation())
            .with_limit(self.config.candidate_limit);
        match text {
            Some(text) => query.with_text(text),
            None => query,
        }
    }

    /// Selectable instances, ranked for the chosen recipient.
    pub fn candidates(&self, text: Option<&str>) -> Vec<Candidate<'_>> {
        candidates::resolve(&self.availability, &self.buffer, &self.query(text))
    }

    /// Per-pool supply for quantity pickers.
    pub fn group_summaries(&self, text: Option<&str>) -> Vec<GroupSummary<'_>> {
        let query = self.query(text).with_limit(None);
        candidates::group_summaries(&self.availability, &self.buffer, &query)
    }

    pub fn add_instance(&mut self, id: InstanceId) -> ReceiptResult<()> {
        self.ensure_ready()?;
        self.buffer.add_instance(id, &self.availability)
    }

    /// Returns whether anything was removed.
    pub fn remove_instance(&mut self, id: InstanceId) -> ReceiptResult<bool> {
        self.ensure_ready()?;
        Ok(self.buffer.remove_instance(id).is_some())
    }

    pub fn set_quantity(&mut self, pool: &PoolKey, desired: usize) -> ReceiptResult<QuantityChange> {
        self.ensure_ready()?;
        self.buffer.set_quantity(pool, desired, &self.availability)
    }

    pub fn lines(&self) -> Vec<Line<'_>> {
        self.buffer.lines(self.availability.catalog())
    }

    /// Validate locally, then persist through the receipt provider.
    ///
    /// Local validation failures make no provider call. A conflict from the
    /// provider leaves the session open with its buffer intact.
    pub async fn submit(&mut self) -> ReceiptResult<ReceiptRecord> {
        self.ensure_ready()?;
        let submission = assemble(
            self.target,
            self.recipient,
            &self.recipients,
            &self.buffer,
            &self.availability,
        )?;

        let count = submission.instance_ids.len();
        let result = match submission.target {
            SubmitTarget::Create => {
                self.providers
                    .receipts
                    .create(submission.recipient_id, submission.instance_ids)
                    .await
            }
            SubmitTarget::Update(receipt_id) => {
                self.providers
                    .receipts
                    .update(receipt_id, submission.recipient_id, submission.instance_ids)
                    .await
            }
        };

        match result {
            Ok(receipt) => {
                tracing::info!(receipt_id = %receipt.id, instances = count, "receipt submitted");
                self.phase = Phase::Closed;
                self.sink.on_success(&receipt);
                Ok(receipt)
            }
            Err(err) => {
                tracing::warn!(error = %err, instances = count, "submission rejected");
                Err(err.into())
            }
        }
    }

    /// Abandon the session. No provider is called.
    pub fn cancel(&mut self) -> ReceiptResult<()> {
        self.ensure_open()?;
        self.buffer = CompositionBuffer::new();
        self.phase = Phase::Closed;
        tracing::info!(editing = ?self.editing(), "editing cancelled");
        self.sink.on_cancel();
        Ok(())
    }
}
