use std::{sync::Arc, time::Duration};

use async_trait::async_trait;
use indomitum_inventory::{
    entities::{image::ImageUpload, plant::{DraftPatch, PlantRecord}, user::Session},
    errors::{AuthError, CaptureError, DashboardError, PersistenceError, WizardError},
    repositories::{
        auth_provider::{AuthProvider, InMemoryAuthProvider},
        memory_store::MemoryDocumentStore,
        plant_store::{CollectionPath, DocumentStore, Snapshot, SnapshotListener, WriteOptions},
        subscription::Subscription,
    },
    use_cases::{
        capture::{CameraScanner, FacingMode, FrameResult, MountElement, MountPoint, ScanConfig},
        dashboard::{Dashboard, DashboardContext, DashboardRegistry, DeleteOutcome},
        table::FilterUpdate,
        wizard::WizardStep,
    },
};
use mockall::mock;
use parking_lot::Mutex;

mod test_plant;
use test_plant::*;
use test_utils::{stub_address, StubGeocoder, TEST_PASSWORD};

const APP_ID: &str = "indomitum-test";

mock! {
    pub Store {}

    #[async_trait]
    impl DocumentStore for Store {
        async fn check_connection(&self) -> Result<(), PersistenceError>;
        async fn subscribe(
            &self,
            path: &CollectionPath,
            order_by: &str,
            listener: SnapshotListener,
        ) -> Result<Subscription, PersistenceError>;
        async fn snapshot(&self, path: &CollectionPath, order_by: &str) -> Result<Snapshot, PersistenceError>;
        async fn upsert(
            &self,
            path: &CollectionPath,
            id: &str,
            record: &PlantRecord,
            options: WriteOptions,
        ) -> Result<(), PersistenceError>;
        async fn delete(&self, path: &CollectionPath, id: &str) -> Result<(), PersistenceError>;
    }
}

struct Harness {
    auth: Arc<InMemoryAuthProvider>,
    ctx: DashboardContext,
    session: Session,
}

async fn harness(store: Arc<dyn DocumentStore>) -> Harness {
    let auth = Arc::new(InMemoryAuthProvider::new());
    auth.register_user("grower@example.com", TEST_PASSWORD, None).unwrap();
    let session = auth.sign_in("grower@example.com", TEST_PASSWORD).await.unwrap();

    let ctx = DashboardContext {
        app_id: APP_ID.to_string(),
        store,
        auth: auth.clone(),
        geocoder: Arc::new(StubGeocoder(stub_address())),
        max_image_bytes: 1024,
    };

    Harness { auth, ctx, session }
}

/// A store mock whose subscription hands its listener back to the test.
fn subscribed_mock(listener_slot: Arc<Mutex<Option<SnapshotListener>>>) -> MockStore {
    let mut store = MockStore::new();
    store
        .expect_subscribe()
        .times(1)
        .returning(move |_, _, listener| {
            listener(Snapshot::default());
            *listener_slot.lock() = Some(listener);
            Ok(Subscription::noop())
        });
    store
}

fn walk_to_review(dashboard: &Dashboard, id: &str, name: &str) {
    dashboard.open_new().unwrap();
    dashboard
        .update_draft(DraftPatch {
            id: Some(id.into()),
            name: Some(name.into()),
            image_url: Some("https://img.example.com/p.jpg".into()),
            address: Some("12 Fern Street".into()),
            ..DraftPatch::default()
        })
        .unwrap();
    for _ in 0..3 {
        dashboard.next_step().unwrap();
    }
}

#[actix_rt::test]
async fn mount_loads_current_plants() {
    let store = Arc::new(MemoryDocumentStore::new());
    let h = harness(store.clone()).await;
    let path = CollectionPath::plants(APP_ID, &h.session.uid);
    store.upsert(&path, "A", &plant("A").added_by(&h.session.uid).build(), WriteOptions::default()).await.unwrap();

    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();
    let view = dashboard.view(false);

    assert!(dashboard.is_mounted());
    assert_eq!(view.total, 1);
    assert_eq!(view.rows[0].added_by_display, "Me");
}

#[actix_rt::test]
async fn stale_snapshots_are_ignored() {
    let slot = Arc::new(Mutex::new(None));
    let h = harness(Arc::new(subscribed_mock(slot.clone()))).await;
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();

    let listener = slot.lock().clone().unwrap();
    listener(Snapshot { version: 3, records: vec![plant("new").build()] });
    listener(Snapshot { version: 2, records: vec![plant("old").build()] });

    assert_eq!(dashboard.snapshot_version(), 3);
    assert_eq!(dashboard.records()[0].id, "new");
}

#[actix_rt::test]
async fn failed_subscription_fails_the_mount() {
    let mut store = MockStore::new();
    store.expect_subscribe().returning(|path, _, _| {
        Err(PersistenceError::Subscribe {
            path: path.to_string(),
            reason: "permission denied".into(),
        })
    });
    let h = harness(Arc::new(store)).await;

    let result = Dashboard::mount(&h.ctx, h.session.clone(), None).await;
    assert!(matches!(result, Err(DashboardError::Persistence(PersistenceError::Subscribe { .. }))));
}

#[actix_rt::test]
async fn mounting_without_session_is_refused() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    h.auth.sign_out(&h.session.uid).await.unwrap();

    let result = Dashboard::mount(&h.ctx, h.session.clone(), None).await;
    assert!(matches!(result, Err(DashboardError::Auth(AuthError::SessionEnded))));
}

#[actix_rt::test]
async fn sign_out_unmounts_the_dashboard() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    let registry = DashboardRegistry::new(h.ctx.clone());

    let dashboard = registry.get_or_mount(&h.session.uid).await.unwrap();
    assert_eq!(registry.len(), 1);

    h.auth.sign_out(&h.session.uid).await.unwrap();

    assert!(!dashboard.is_mounted());
    assert!(registry.get(&h.session.uid).is_none());
    assert!(registry.is_empty());
}

#[actix_rt::test]
async fn unmounted_dashboard_stops_receiving_snapshots() {
    let store = Arc::new(MemoryDocumentStore::new());
    let h = harness(store.clone()).await;
    let path = CollectionPath::plants(APP_ID, &h.session.uid);

    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();
    dashboard.teardown();
    store.upsert(&path, "A", &plant("A").build(), WriteOptions::default()).await.unwrap();

    assert!(dashboard.records().is_empty());
}

#[actix_rt::test]
async fn registry_reuses_mounted_dashboard_and_sweeps_idle_ones() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    let registry = DashboardRegistry::new(h.ctx.clone());

    let first = registry.get_or_mount(&h.session.uid).await.unwrap();
    let second = registry.get_or_mount(&h.session.uid).await.unwrap();
    assert!(Arc::ptr_eq(&first, &second));

    assert_eq!(registry.sweep_idle(Duration::from_secs(3600)), 0);
    std::thread::sleep(Duration::from_millis(5));
    assert_eq!(registry.sweep_idle(Duration::ZERO), 1);
    assert!(!first.is_mounted());
    assert!(registry.is_empty());
}

#[actix_rt::test]
async fn registry_refuses_users_without_session() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    let registry = DashboardRegistry::new(h.ctx.clone());

    let result = registry.get_or_mount("nobody").await;
    assert!(matches!(result, Err(DashboardError::Auth(AuthError::SessionEnded))));
}

#[actix_rt::test]
async fn submitting_same_id_twice_keeps_one_record_and_first_owner() {
    let store = Arc::new(MemoryDocumentStore::new());
    let h = harness(store.clone()).await;
    let path = CollectionPath::plants(APP_ID, &h.session.uid);
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();

    walk_to_review(&dashboard, "P-1", "Fern");
    let receipt = dashboard.submit().await.unwrap();
    assert_eq!(receipt.message, "Success! Plant \"Fern\" has been added/updated.");
    assert!(!dashboard.wizard_state().is_open());

    dashboard.open_edit("P-1").unwrap();
    dashboard.update_draft(DraftPatch { name: Some("Boston Fern".into()), ..DraftPatch::default() }).unwrap();
    for _ in 0..3 {
        dashboard.next_step().unwrap();
    }
    dashboard.submit().await.unwrap();

    assert_eq!(store.document_count(&path), 1);
    let records = dashboard.records();
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].name, "Boston Fern");
    assert_eq!(records[0].added_by, h.session.uid);
    assert!(records[0].date_added.is_some());
}

#[actix_rt::test]
async fn receipt_names_the_id_when_the_plant_is_unnamed() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();

    walk_to_review(&dashboard, "P-9", "");
    let receipt = dashboard.submit().await.unwrap();
    assert_eq!(receipt.id, "P-9");
    assert_eq!(receipt.message, "Success! Plant \"P-9\" has been added/updated.");
}

#[actix_rt::test]
async fn failed_write_keeps_the_form_open_for_retry() {
    let slot = Arc::new(Mutex::new(None));
    let mut store = subscribed_mock(slot);
    store.expect_upsert().times(1).returning(|_, id, _, _| {
        Err(PersistenceError::Write {
            id: id.to_string(),
            reason: "quota exceeded".into(),
        })
    });
    let h = harness(Arc::new(store)).await;
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();

    walk_to_review(&dashboard, "P-1", "Fern");
    let result = dashboard.submit().await;

    assert!(matches!(result, Err(DashboardError::Persistence(PersistenceError::Write { .. }))));
    let state = dashboard.wizard_state();
    assert_eq!(state.step, Some(WizardStep::Review));
    assert!(!state.submitting);
    assert_eq!(state.draft.id, "P-1");
}

#[actix_rt::test]
async fn submit_is_rejected_before_review() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();
    dashboard.open_new().unwrap();

    let result = dashboard.submit().await;
    assert!(matches!(result, Err(DashboardError::Wizard(WizardError::NotAtReview))));
}

#[actix_rt::test]
async fn editing_unknown_plant_is_rejected() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();

    assert_eq!(dashboard.open_edit("ghost"), Err(WizardError::UnknownPlant("ghost".into())));
}

#[actix_rt::test]
async fn bulk_delete_confirms_then_reports_and_clears_selection() {
    let store = Arc::new(MemoryDocumentStore::new());
    let h = harness(store.clone()).await;
    let path = CollectionPath::plants(APP_ID, &h.session.uid);
    for id in ["A", "B", "C"] {
        store.upsert(&path, id, &plant(id).build(), WriteOptions::default()).await.unwrap();
    }
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();

    assert!(matches!(dashboard.delete_selected(true).await, Err(DashboardError::NothingSelected)));

    dashboard.toggle_row("A");
    dashboard.toggle_row("C");
    match dashboard.delete_selected(false).await.unwrap() {
        DeleteOutcome::ConfirmationRequired { prompt } => {
            assert_eq!(prompt, "Are you sure you want to permanently delete 2 plant(s)?");
        }
        other => panic!("expected confirmation prompt, got {:?}", other),
    }

    match dashboard.delete_selected(true).await.unwrap() {
        DeleteOutcome::Completed { message, report } => {
            assert_eq!(message, "2 plants deleted successfully.");
            assert_eq!(report.deleted, vec!["A".to_string(), "C".to_string()]);
        }
        other => panic!("expected completed delete, got {:?}", other),
    }

    assert!(dashboard.view(false).selected.is_empty());
    let remaining: Vec<String> = dashboard.records().into_iter().map(|r| r.id).collect();
    assert_eq!(remaining, vec!["B".to_string()]);
}

#[actix_rt::test]
async fn partial_delete_failure_is_reported_and_selection_still_cleared() {
    let slot = Arc::new(Mutex::new(None));
    let mut store = subscribed_mock(slot);
    store.expect_delete().times(2).returning(|_, id| {
        if id == "B" {
            Err(PersistenceError::Delete {
                id: id.to_string(),
                reason: "offline".into(),
            })
        } else {
            Ok(())
        }
    });
    let h = harness(Arc::new(store)).await;
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();

    dashboard.toggle_row("A");
    dashboard.toggle_row("B");

    match dashboard.delete_selected(true).await.unwrap() {
        DeleteOutcome::Completed { message, report } => {
            assert_eq!(message, "Failed to delete 1 of 2 plants.");
            assert_eq!(report.failed[0].id, "B");
        }
        other => panic!("expected completed delete, got {:?}", other),
    }
    assert!(dashboard.view(false).selected.is_empty());
}

#[actix_rt::test]
async fn select_all_follows_the_filtered_view() {
    let store = Arc::new(MemoryDocumentStore::new());
    let h = harness(store.clone()).await;
    let path = CollectionPath::plants(APP_ID, &h.session.uid);
    store.upsert(&path, "A", &plant("A").country("Portugal").build(), WriteOptions::default()).await.unwrap();
    store.upsert(&path, "B", &plant("B").country("Spain").build(), WriteOptions::default()).await.unwrap();
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();

    dashboard.update_filters(FilterUpdate { country: Some("spain".into()), ..FilterUpdate::default() });
    dashboard.toggle_select_all();

    let view = dashboard.view(false);
    assert_eq!(view.selected, vec!["B".to_string()]);
    assert!(view.all_selected);
    assert_eq!(view.visible, 1);
    assert_eq!(view.total, 2);
}

#[actix_rt::test]
async fn captured_location_is_geocoded_into_the_draft() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();

    assert_eq!(dashboard.capture_location(1.0, 2.0).await, Err(WizardError::NotOpen));

    dashboard.open_new().unwrap();
    let state = dashboard.capture_location(38.72, -9.14).await.unwrap();

    assert_eq!(state.draft.latitude, "38.72");
    assert_eq!(state.draft.city, "Lisbon");
    assert_eq!(state.draft.zip, "1100-001");
}

#[actix_rt::test]
async fn photos_become_embedded_images() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();
    dashboard.open_new().unwrap();

    let state = dashboard
        .attach_photo(ImageUpload { file_name: Some("leaf.png".into()), bytes: PNG_PIXEL.to_vec() })
        .unwrap();
    assert!(state.draft.image_url.starts_with("data:image/png;base64,"));

    let not_an_image = ImageUpload { file_name: Some("notes.png".into()), bytes: b"plain text".to_vec() };
    assert_eq!(dashboard.attach_photo(not_an_image), Err(WizardError::UnreadableImage));

    let too_large = ImageUpload { file_name: None, bytes: vec![0u8; 2048] };
    assert_eq!(dashboard.attach_photo(too_large), Err(WizardError::ImageTooLarge(1024)));
}

struct InstantScanner;

#[async_trait]
impl CameraScanner for InstantScanner {
    async fn start(&self, _mount_id: &str, _facing: FacingMode, _config: ScanConfig) -> Result<(), CaptureError> {
        Ok(())
    }

    async fn stop(&self) -> Result<(), CaptureError> {
        Ok(())
    }
}

struct BareMount;

impl MountPoint for BareMount {
    fn id(&self) -> &str {
        "reader"
    }

    fn remove_element(&self, _element: MountElement) -> bool {
        false
    }

    fn has_element(&self, _element: MountElement) -> bool {
        false
    }
}

#[actix_rt::test]
async fn scanned_code_fills_the_plant_id() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();
    dashboard.open_new().unwrap();

    let capture = dashboard.attach_scanner(Arc::new(InstantScanner), Arc::new(BareMount));
    capture.start().await.unwrap();
    capture.handle_frame(FrameResult::Decoded("QR-77".into())).await;

    assert_eq!(dashboard.wizard_state().draft.id, "QR-77");
}

#[actix_rt::test]
async fn leaving_the_form_closes_the_scanner() {
    let h = harness(Arc::new(MemoryDocumentStore::new())).await;
    let dashboard = Dashboard::mount(&h.ctx, h.session.clone(), None).await.unwrap();
    dashboard.open_new().unwrap();
    dashboard.attach_scanner(Arc::new(InstantScanner), Arc::new(BareMount));

    assert!(dashboard.exit(false).unwrap().is_open());
    assert!(dashboard.scanner().is_some());

    assert!(!dashboard.exit(true).unwrap().is_open());
    assert!(dashboard.scanner().is_none());
}
