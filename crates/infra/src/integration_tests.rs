//! Integration tests for full editing sessions.
//!
//! Tests: providers → ReceiptEditor → CompositionBuffer → ReceiptProvider
//!
//! Verifies:
//! - Local validation never reaches the receipt provider
//! - Instances bound to another receipt stay out of reach, except for the
//!   receipt that already owns them
//! - Conflicts and fetch failures leave the session intact

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use handreceipt_composition::{Line, ReceiptRecord, Recipient};
    use handreceipt_core::{InstanceId, LocationId, ReceiptError, ReceiptId, RecipientId, UnitId};
    use handreceipt_inventory::{AllocationKey, PoolKey, RawAllocation, RawInstanceRecord, RawNamedRef};

    use crate::config::EditorConfig;
    use crate::editor::{CompletionSink, ReceiptEditor};
    use crate::providers::{InMemoryCatalog, InMemoryDirectory, InMemoryReceiptStore, Providers};

    type Editor = ReceiptEditor<Arc<InMemoryCatalog>, Arc<InMemoryReceiptStore>, Arc<InMemoryDirectory>>;

    #[derive(Clone, Default)]
    struct RecordingSink {
        events: Arc<Mutex<Vec<String>>>,
    }

    impl RecordingSink {
        fn events(&self) -> Vec<String> {
            self.events.lock().unwrap().clone()
        }
    }

    impl CompletionSink for RecordingSink {
        fn on_success(&self, receipt: &ReceiptRecord) {
            self.events.lock().unwrap().push(format!("success:{}", receipt.id));
        }

        fn on_cancel(&self) {
            self.events.lock().unwrap().push("cancel".to_string());
        }
    }

    fn radio(id: InstanceId) -> RawInstanceRecord {
        RawInstanceRecord {
            id: Some(id.to_string()),
            name: Some("Radio".to_string()),
            ..Default::default()
        }
    }

    fn rifle(id: InstanceId, home: &AllocationKey) -> RawInstanceRecord {
        let named = |id: String, name: &str| RawNamedRef {
            id: Some(id),
            name: Some(name.to_string()),
        };
        RawInstanceRecord {
            id: Some(id.to_string()),
            name: Some("Rifle".to_string()),
            id_number: Some("X-77".to_string()),
            report_required: Some(true),
            allocation: Some(RawAllocation {
                location: home.location.map(|l| named(l.to_string(), "North depot")),
                unit: home.unit.map(|u| named(u.to_string(), "2nd platoon")),
            }),
        }
    }

    struct Fixture {
        catalog: Arc<InMemoryCatalog>,
        store: Arc<InMemoryReceiptStore>,
        directory: Arc<InMemoryDirectory>,
        sink: RecordingSink,
        alice: Recipient,
        radios: Vec<InstanceId>,
        x77: InstanceId,
        home: AllocationKey,
    }

    impl Fixture {
        fn new() -> Self {
            EditorConfig::default().init_observability();

            let home = AllocationKey::new(Some(LocationId::new()), Some(UnitId::new()));
            let radios: Vec<InstanceId> = (0..3).map(|_| InstanceId::new()).collect();
            let x77 = InstanceId::new();

            let mut records: Vec<RawInstanceRecord> = radios.iter().map(|id| radio(*id)).collect();
            records.push(rifle(x77, &home));

            let catalog = Arc::new(InMemoryCatalog::new(records));
            let store = Arc::new(InMemoryReceiptStore::new(catalog.clone()));
            let alice = Recipient {
                id: RecipientId::new(),
                name: "Alice".to_string(),
                home_allocation: Some(home),
            };
            let directory = Arc::new(InMemoryDirectory::new(vec![alice.clone()]));

            Self {
                catalog,
                store,
                directory,
                sink: RecordingSink::default(),
                alice,
                radios,
                x77,
                home,
            }
        }

        fn providers(&self) -> Providers<Arc<InMemoryCatalog>, Arc<InMemoryReceiptStore>, Arc<InMemoryDirectory>> {
            Providers::new(self.catalog.clone(), self.store.clone(), self.directory.clone())
        }

        fn creator(&self) -> Editor {
            self.creator_with(EditorConfig::default())
        }

        fn creator_with(&self, config: EditorConfig) -> Editor {
            ReceiptEditor::create(self.providers(), config).with_sink(self.sink.clone())
        }

        fn editor_for(&self, receipt_id: ReceiptId) -> Editor {
            ReceiptEditor::edit(self.providers(), EditorConfig::default(), receipt_id).with_sink(self.sink.clone())
        }
    }

    fn radio_pool() -> PoolKey {
        PoolKey::new("Radio", None)
    }

    #[tokio::test]
    async fn create_session_persists_selection() {
        let fx = Fixture::new();
        let mut editor = fx.creator();

        let report = editor.load().await.unwrap();
        assert_eq!(report.catalog_size, 4);
        assert_eq!(report.open_receipts, 0);

        editor.select_recipient(fx.alice.id).unwrap();
        let change = editor.set_quantity(&radio_pool(), 2).unwrap();
        assert_eq!(change.added, fx.radios[..2].to_vec());
        editor.add_instance(fx.x77).unwrap();

        let lines = editor.lines();
        assert_eq!(lines.len(), 2);
        assert!(matches!(lines[0], Line::Group { count: 2, .. }));
        assert!(matches!(lines[1], Line::Single(i) if i.id() == fx.x77));

        let receipt = editor.submit().await.unwrap();
        assert_eq!(receipt.recipient_id, fx.alice.id);
        assert_eq!(
            receipt.bound_instance_ids().collect::<Vec<_>>(),
            vec![fx.radios[0], fx.radios[1], fx.x77]
        );

        assert!(editor.is_closed());
        assert_eq!(fx.store.write_count(), 1);
        assert_eq!(fx.sink.events(), vec![format!("success:{}", receipt.id)]);
        assert_eq!(editor.add_instance(fx.radios[2]), Err(ReceiptError::NotReady));
    }

    #[tokio::test]
    async fn submit_without_recipient_makes_no_call() {
        let fx = Fixture::new();
        let mut editor = fx.creator();
        editor.load().await.unwrap();
        editor.add_instance(fx.x77).unwrap();

        assert_eq!(editor.submit().await, Err(ReceiptError::InvalidRecipient));
        assert_eq!(fx.store.write_count(), 0);
        assert!(editor.buffer().contains(fx.x77));
        assert!(editor.is_ready());
        assert!(fx.sink.events().is_empty());
    }

    #[tokio::test]
    async fn submit_of_empty_selection_makes_no_call() {
        let fx = Fixture::new();
        let mut editor = fx.creator();
        editor.load().await.unwrap();
        editor.select_recipient(fx.alice.id).unwrap();

        assert_eq!(editor.submit().await, Err(ReceiptError::EmptyComposition));
        assert_eq!(fx.store.write_count(), 0);
    }

    #[tokio::test]
    async fn unknown_recipient_is_rejected() {
        let fx = Fixture::new();
        let mut editor = fx.creator();
        editor.load().await.unwrap();

        assert_eq!(
            editor.select_recipient(RecipientId::new()),
            Err(ReceiptError::InvalidRecipient)
        );
        assert!(editor.recipient().is_none());
    }

    #[tokio::test]
    async fn bound_instance_is_only_reachable_from_its_own_receipt() {
        let fx = Fixture::new();
        let r1 = fx.store.open(fx.alice.id, &[fx.x77]).unwrap();

        let mut other = fx.creator();
        other.load().await.unwrap();
        assert!(other.candidates(None).iter().all(|c| c.instance.id() != fx.x77));
        assert_eq!(
            other.add_instance(fx.x77),
            Err(ReceiptError::DuplicateSelection(fx.x77))
        );

        let mut own = fx.editor_for(r1.id);
        own.load().await.unwrap();
        assert!(own.buffer().contains(fx.x77));
        assert_eq!(own.recipient().map(|r| r.id), Some(fx.alice.id));

        own.remove_instance(fx.x77).unwrap();
        assert!(own.candidates(None).iter().any(|c| c.instance.id() == fx.x77));
        own.add_instance(fx.x77).unwrap();
    }

    #[tokio::test]
    async fn update_keeps_owned_instances_missing_from_catalog() {
        let fx = Fixture::new();
        let r1 = fx.store.open(fx.alice.id, &[fx.x77]).unwrap();
        fx.catalog.replace(fx.radios.iter().map(|id| radio(*id)).collect()).unwrap();

        let mut editor = fx.editor_for(r1.id);
        editor.load().await.unwrap();
        assert!(editor.availability().catalog().contains(fx.x77));
        editor.set_quantity(&radio_pool(), 1).unwrap();

        let updated = editor.submit().await.unwrap();
        assert_eq!(updated.id, r1.id);
        assert_eq!(
            updated.bound_instance_ids().collect::<Vec<_>>(),
            vec![fx.x77, fx.radios[0]]
        );
        assert_eq!(fx.store.receipts().len(), 1);
    }

    #[tokio::test]
    async fn editing_unknown_receipt_fails_to_load() {
        let fx = Fixture::new();
        let mut editor = fx.editor_for(ReceiptId::new());

        let err = editor.load().await.unwrap_err();
        assert!(matches!(err, ReceiptError::TransientFetchError(ref msg) if msg.contains("not found")));
        assert!(!editor.is_ready());
    }

    #[tokio::test]
    async fn conflict_keeps_buffer_for_resubmission() {
        let fx = Fixture::new();
        let mut first = fx.creator();
        let mut second = fx.creator();
        first.load().await.unwrap();
        second.load().await.unwrap();

        for editor in [&mut first, &mut second] {
            editor.select_recipient(fx.alice.id).unwrap();
            editor.add_instance(fx.x77).unwrap();
        }

        first.submit().await.unwrap();
        let err = second.submit().await.unwrap_err();
        assert!(matches!(err, ReceiptError::ConflictOnSubmit(_)));
        assert!(!err.is_local());
        assert!(second.is_ready());
        assert!(second.buffer().contains(fx.x77));
        assert_eq!(fx.sink.events().len(), 1);

        let report = second.refresh_receipts().await.unwrap();
        assert_eq!(report.released, 1);
        assert!(second.buffer().is_empty());
    }

    #[tokio::test]
    async fn fetch_failure_leaves_prior_snapshot() {
        let fx = Fixture::new();
        let mut editor = fx.creator();
        editor.load().await.unwrap();
        editor.add_instance(fx.radios[0]).unwrap();

        fx.catalog.replace(Vec::new()).unwrap();
        fx.catalog.fail_next_fetch();
        let err = editor.refresh_catalog().await.unwrap_err();
        assert!(matches!(err, ReceiptError::TransientFetchError(_)));
        assert_eq!(editor.availability().catalog().len(), 4);
        assert!(editor.buffer().contains(fx.radios[0]));

        fx.store.fail_next_fetch();
        assert!(editor.load().await.is_err());
        assert_eq!(editor.availability().catalog().len(), 4);
        assert!(editor.is_ready());
    }

    #[tokio::test]
    async fn failed_first_load_keeps_editor_not_ready() {
        let fx = Fixture::new();
        let mut editor = fx.creator();

        fx.directory.fail_next_fetch();
        assert!(matches!(editor.load().await, Err(ReceiptError::TransientFetchError(_))));
        assert_eq!(editor.add_instance(fx.x77), Err(ReceiptError::NotReady));

        editor.load().await.unwrap();
        editor.add_instance(fx.x77).unwrap();
    }

    #[tokio::test]
    async fn refresh_drops_selection_gone_from_catalog() {
        let fx = Fixture::new();
        let mut editor = fx.creator();
        editor.load().await.unwrap();
        editor.set_quantity(&radio_pool(), 2).unwrap();

        fx.catalog.replace(fx.radios[1..].iter().map(|id| radio(*id)).collect()).unwrap();
        let report = editor.refresh_catalog().await.unwrap();

        assert_eq!(report.released, 1);
        assert_eq!(report.catalog_size, 2);
        assert_eq!(editor.buffer().instance_ids().collect::<Vec<_>>(), vec![fx.radios[1]]);
    }

    #[tokio::test]
    async fn cancel_signals_and_writes_nothing() {
        let fx = Fixture::new();
        let mut editor = fx.creator();
        editor.load().await.unwrap();
        editor.select_recipient(fx.alice.id).unwrap();
        editor.add_instance(fx.x77).unwrap();

        editor.cancel().unwrap();

        assert_eq!(fx.sink.events(), vec!["cancel".to_string()]);
        assert_eq!(fx.store.write_count(), 0);
        assert!(editor.is_closed());
        assert!(editor.buffer().is_empty());
        assert_eq!(editor.submit().await, Err(ReceiptError::NotReady));
        assert_eq!(editor.cancel(), Err(ReceiptError::NotReady));
    }

    #[tokio::test]
    async fn candidates_follow_recipient_home_and_config_limit() {
        let fx = Fixture::new();
        let mut editor = fx.creator();
        editor.load().await.unwrap();
        editor.select_recipient(fx.alice.id).unwrap();
        assert_eq!(editor.home_allocation(), Some(fx.home));

        let all = editor.candidates(None);
        assert_eq!(all.len(), 4);
        assert_eq!(all[0].instance.id(), fx.x77);
        assert_eq!(all[0].remaining, 1);
        assert_eq!(all[1].remaining, 3);

        let radios = editor.candidates(Some("  RADIO "));
        assert_eq!(radios.len(), 3);

        let by_depot = editor.candidates(Some("north"));
        assert_eq!(by_depot.len(), 1);

        let mut limited = fx.creator_with(EditorConfig {
            candidate_limit: Some(1),
            ..EditorConfig::default()
        });
        limited.load().await.unwrap();
        assert_eq!(limited.candidates(None).len(), 1);
        assert_eq!(limited.group_summaries(None).len(), 1);
    }

    #[tokio::test]
    async fn quantity_beyond_supply_is_rejected() {
        let fx = Fixture::new();
        let mut editor = fx.creator();
        editor.load().await.unwrap();

        assert_eq!(
            editor.set_quantity(&radio_pool(), 4),
            Err(ReceiptError::insufficient(4, 3))
        );
        assert!(editor.buffer().is_empty());

        editor.set_quantity(&radio_pool(), 3).unwrap();
        let summary = &editor.group_summaries(None)[0];
        assert_eq!((summary.supply, summary.reserved, summary.remaining), (3, 3, 0));
    }

    #[tokio::test]
    async fn json_feed_uses_configured_unknown_group() {
        let fx = Fixture::new();
        let id = InstanceId::new();
        let json = format!(r#"[{{ "id": "{id}", "name": "  " }}, {{ "name": "no identity" }}]"#);
        let config = EditorConfig::from_lookup(|key| {
            (key == crate::config::ENV_UNKNOWN_GROUP).then(|| "unsorted".to_string())
        });

        let catalog = Arc::new(InMemoryCatalog::from_json(&json).unwrap());
        let store = Arc::new(InMemoryReceiptStore::new(catalog.clone()).with_normalize_options(config.normalize_options()));
        let providers = Providers::new(catalog, store.clone(), fx.directory.clone());

        let mut editor = ReceiptEditor::create(providers, config);
        let report = editor.load().await.unwrap();

        assert_eq!(report.catalog_size, 1);
        let summaries = editor.group_summaries(None);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].pool.group, "unsorted");

        let pool = summaries[0].pool.clone();
        editor.select_recipient(fx.alice.id).unwrap();
        editor.set_quantity(&pool, 1).unwrap();
        let receipt = editor.submit().await.unwrap();
        assert_eq!(receipt.items[0].group(), "unsorted");
        assert_eq!(store.get(receipt.id), Some(receipt));
    }

    #[tokio::test]
    async fn update_seeds_selection_from_current_catalog_copy() {
        let fx = Fixture::new();
        let r1 = fx.store.open(fx.alice.id, &[fx.radios[0]]).unwrap();

        let at_depot = |id: InstanceId| RawInstanceRecord {
            allocation: Some(RawAllocation {
                location: fx.home.location.map(|l| RawNamedRef {
                    id: Some(l.to_string()),
                    name: Some("North depot".to_string()),
                }),
                unit: None,
            }),
            ..radio(id)
        };
        fx.catalog
            .replace(vec![at_depot(fx.radios[0]), at_depot(fx.radios[1])])
            .unwrap();

        let mut editor = fx.editor_for(r1.id);
        editor.load().await.unwrap();

        let depot = PoolKey::new("Radio", Some(AllocationKey::new(fx.home.location, None)));
        assert_eq!(editor.buffer().reserved(&radio_pool()), 0);
        assert_eq!(editor.buffer().reserved(&depot), 1);

        let candidates = editor.candidates(None);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].instance.id(), fx.radios[1]);
        assert_eq!(candidates[0].remaining, 1);

        let summaries = editor.group_summaries(None);
        assert_eq!(summaries.len(), 1);
        assert_eq!(summaries[0].pool, depot);
        assert_eq!((summaries[0].supply, summaries[0].reserved, summaries[0].remaining), (2, 1, 1));

        assert_eq!(
            editor.set_quantity(&depot, 3),
            Err(ReceiptError::insufficient(3, 2))
        );
        editor.set_quantity(&depot, 2).unwrap();
        assert_eq!(editor.buffer().total_instances(), 2);
    }

    #[tokio::test]
    async fn update_without_recipient_makes_no_call() {
        let fx = Fixture::new();
        let r1 = fx.store.open(fx.alice.id, &[fx.x77]).unwrap();

        let mut editor = fx.editor_for(r1.id);
        editor.load().await.unwrap();
        assert_eq!(editor.recipient().map(|r| r.id), Some(fx.alice.id));

        editor.clear_recipient();
        assert_eq!(editor.home_allocation(), None);
        assert_eq!(editor.submit().await, Err(ReceiptError::InvalidRecipient));
        assert_eq!(fx.store.write_count(), 0);
        assert_eq!(fx.store.get(r1.id), Some(r1));
    }

    #[tokio::test]
    async fn reload_picks_up_new_recipients_and_instances() {
        let fx = Fixture::new();
        let mut editor = fx.creator();
        editor.load().await.unwrap();

        let bob = Recipient {
            id: RecipientId::new(),
            name: "Bob".to_string(),
            home_allocation: None,
        };
        fx.directory.push(bob.clone()).unwrap();
        assert_eq!(editor.select_recipient(bob.id), Err(ReceiptError::InvalidRecipient));

        let extra = InstanceId::new();
        fx.catalog.push(radio(extra)).unwrap();
        let report = editor.refresh_catalog().await.unwrap();
        assert_eq!(report.catalog_size, 5);
        assert!(editor.candidates(Some("radio")).iter().any(|c| c.instance.id() == extra));

        editor.load().await.unwrap();
        editor.select_recipient(bob.id).unwrap();
        assert_eq!(editor.home_allocation(), None);
    }
}
