use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Weak,
    },
    time::{Duration, Instant},
};

use chrono::Utc;
use dashmap::{mapref::entry::Entry, DashMap};
use futures::future::join_all;
use parking_lot::{Mutex, RwLock};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    entities::{
        image::ImageUpload,
        plant::{DraftPatch, PlantRecord, PlantView},
        user::Session,
    },
    errors::{AuthError, DashboardError, ExportError, WizardError},
    repositories::{
        auth_provider::AuthProvider,
        geocoder::ReverseGeocoder,
        plant_store::{CollectionPath, DocumentStore, Snapshot, WriteOptions, DEFAULT_ORDER_BY},
        subscription::Subscription,
    },
    use_cases::{
        capture::{CameraScanner, MountPoint, QrCapture},
        export::{export_csv, ExportFile},
        table::{DeletePlan, FilterUpdate, InventoryTable, PlantFilters, SortConfig},
        wizard::{transition, WizardAction, WizardState, WizardView},
    },
};

/// Collaborators shared by every mounted dashboard.
#[derive(Clone)]
pub struct DashboardContext {
    pub app_id: String,
    pub store: Arc<dyn DocumentStore>,
    pub auth: Arc<dyn AuthProvider>,
    pub geocoder: Arc<dyn ReverseGeocoder>,
    pub max_image_bytes: usize,
}

#[derive(Debug, Default)]
struct LiveList {
    version: u64,
    records: Vec<PlantRecord>,
}

impl LiveList {
    fn apply(&mut self, snapshot: Snapshot) -> bool {
        if snapshot.version < self.version {
            return false;
        }
        self.version = snapshot.version;
        self.records = snapshot.records;
        true
    }
}

pub type TeardownHook = Box<dyn Fn(&str, Uuid) + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DashboardMode {
    List,
    Wizard,
}

#[derive(Debug, Clone, Serialize)]
pub struct DashboardView {
    pub mode: DashboardMode,
    pub step: u8,
    pub rows: Vec<PlantView>,
    pub total: usize,
    pub visible: usize,
    pub sort: SortConfig,
    pub filters: PlantFilters,
    pub query: String,
    pub selected: Vec<String>,
    pub all_selected: bool,
    pub wizard: WizardView,
}

#[derive(Debug, Clone, Serialize)]
pub struct DeleteFailure {
    pub id: String,
    pub error: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct DeleteReport {
    pub deleted: Vec<String>,
    pub failed: Vec<DeleteFailure>,
}

impl DeleteReport {
    pub fn message(&self) -> String {
        if self.failed.is_empty() {
            format!("{} plants deleted successfully.", self.deleted.len())
        } else {
            format!(
                "Failed to delete {} of {} plants.",
                self.failed.len(),
                self.failed.len() + self.deleted.len()
            )
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DeleteOutcome {
    ConfirmationRequired { prompt: String },
    Completed { message: String, report: DeleteReport },
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitReceipt {
    pub id: String,
    pub message: String,
}

/// One signed-in user's admin page: the live plant list, the table state
/// over it and the add/edit form.
pub struct Dashboard {
    instance: Uuid,
    session: Session,
    path: CollectionPath,
    store: Arc<dyn DocumentStore>,
    geocoder: Arc<dyn ReverseGeocoder>,
    max_image_bytes: usize,
    live: Arc<RwLock<LiveList>>,
    table: Mutex<InventoryTable>,
    wizard: Mutex<WizardState>,
    capture: Mutex<Option<Arc<QrCapture>>>,
    subscriptions: Mutex<Vec<Subscription>>,
    mounted: AtomicBool,
    last_active: Mutex<Instant>,
    on_teardown: Option<TeardownHook>,
}

impl Dashboard {
    /// Subscribes to the user's plants and to their auth state. Fails when
    /// the session is already gone by the time both are in place.
    pub async fn mount(
        ctx: &DashboardContext,
        session: Session,
        on_teardown: Option<TeardownHook>,
    ) -> Result<Arc<Dashboard>, DashboardError> {
        let dashboard = Arc::new(Dashboard {
            instance: Uuid::new_v4(),
            path: CollectionPath::plants(&ctx.app_id, &session.uid),
            session,
            store: Arc::clone(&ctx.store),
            geocoder: Arc::clone(&ctx.geocoder),
            max_image_bytes: ctx.max_image_bytes,
            live: Arc::new(RwLock::new(LiveList::default())),
            table: Mutex::new(InventoryTable::new()),
            wizard: Mutex::new(WizardState::default()),
            capture: Mutex::new(None),
            subscriptions: Mutex::new(Vec::new()),
            mounted: AtomicBool::new(true),
            last_active: Mutex::new(Instant::now()),
            on_teardown,
        });

        let live = Arc::clone(&dashboard.live);
        let collection = dashboard.path.to_string();
        let store_subscription = ctx
            .store
            .subscribe(
                &dashboard.path,
                DEFAULT_ORDER_BY,
                Arc::new(move |snapshot: Snapshot| {
                    let version = snapshot.version;
                    if !live.write().apply(snapshot) {
                        tracing::debug!(collection = %collection, version, "Ignoring stale snapshot");
                    }
                }),
            )
            .await
            .inspect_err(|e| tracing::error!("Error fetching plants: {}", e))?;
        dashboard.subscriptions.lock().push(store_subscription);

        let weak: Weak<Dashboard> = Arc::downgrade(&dashboard);
        let auth_subscription = ctx.auth.on_auth_state_changed(
            &dashboard.session.uid,
            Arc::new(move |session: Option<Session>| {
                if session.is_none() {
                    if let Some(dashboard) = weak.upgrade() {
                        tracing::info!(uid = %dashboard.session.uid, "Session ended, closing dashboard");
                        dashboard.teardown();
                    }
                }
            }),
        );

        if !dashboard.is_mounted() {
            return Err(AuthError::SessionEnded.into());
        }
        dashboard.subscriptions.lock().push(auth_subscription);

        tracing::info!(uid = %dashboard.session.uid, path = %dashboard.path, "Dashboard mounted");
        Ok(dashboard)
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted.load(Ordering::Acquire)
    }

    pub fn touch(&self) {
        *self.last_active.lock() = Instant::now();
    }

    pub fn idle_for(&self) -> Duration {
        self.last_active.lock().elapsed()
    }

    /// Releases both subscriptions and any running scanner. Safe to call
    /// more than once, including from inside a subscription callback.
    pub fn teardown(&self) {
        if !self.mounted.swap(false, Ordering::AcqRel) {
            return;
        }

        let subscriptions = std::mem::take(&mut *self.subscriptions.lock());
        for subscription in &subscriptions {
            subscription.dispose();
        }
        self.close_scanner();

        if let Some(hook) = &self.on_teardown {
            hook(&self.session.uid, self.instance);
        }
        tracing::info!(uid = %self.session.uid, "Dashboard unmounted");
    }

    pub fn records(&self) -> Vec<PlantRecord> {
        self.live.read().records.clone()
    }

    pub fn snapshot_version(&self) -> u64 {
        self.live.read().version
    }

    pub fn wizard_state(&self) -> WizardState {
        self.wizard.lock().clone()
    }

    fn visible_rows(&self) -> Vec<PlantView> {
        let records = self.records();
        self.table.lock().visible(&records, &self.session.uid)
    }

    pub fn view(&self, qr_scan_available: bool) -> DashboardView {
        let records = self.records();
        let wizard = self.wizard.lock().view(qr_scan_available);
        let table = self.table.lock();
        let rows = table.visible(&records, &self.session.uid);
        let all_selected = !rows.is_empty() && rows.iter().all(|row| table.is_selected(row.id()));

        DashboardView {
            mode: if wizard.open { DashboardMode::Wizard } else { DashboardMode::List },
            step: wizard.step,
            total: records.len(),
            visible: rows.len(),
            rows,
            sort: table.sort.clone(),
            filters: table.filters.clone(),
            query: table.query.clone(),
            selected: table.selected().to_vec(),
            all_selected,
            wizard,
        }
    }

    // ───── Table ─────────────────────────────────────────────────────

    pub fn update_filters(&self, update: FilterUpdate) {
        self.table.lock().update_filters(update);
    }

    pub fn clear_filters(&self) {
        self.table.lock().clear_filters();
    }

    pub fn request_sort(&self, key: &str) {
        self.table.lock().sort.request(key);
    }

    pub fn toggle_row(&self, plant_id: &str) {
        self.table.lock().toggle_row(plant_id);
    }

    pub fn toggle_select_all(&self) {
        let ids: Vec<String> = self.visible_rows().iter().map(|row| row.id().to_string()).collect();
        self.table.lock().toggle_select_all(&ids);
    }

    pub fn export(&self) -> Result<ExportFile, ExportError> {
        export_csv(&self.visible_rows())
    }

    /// Issues one delete per selected plant. The selection is cleared once
    /// the deletes have settled, whatever their outcome.
    pub async fn delete_selected(&self, confirmed: bool) -> Result<DeleteOutcome, DashboardError> {
        let ids = match self.table.lock().plan_delete(confirmed) {
            DeletePlan::NothingSelected => return Err(DashboardError::NothingSelected),
            DeletePlan::NeedsConfirmation { prompt } => {
                return Ok(DeleteOutcome::ConfirmationRequired { prompt });
            }
            DeletePlan::Confirmed(ids) => ids,
        };

        let results = join_all(ids.iter().map(|id| self.store.delete(&self.path, id))).await;
        self.table.lock().clear_selection();

        let mut report = DeleteReport::default();
        for (id, result) in ids.into_iter().zip(results) {
            match result {
                Ok(()) => report.deleted.push(id),
                Err(e) => {
                    tracing::error!("Error deleting plant {}: {}", id, e);
                    report.failed.push(DeleteFailure { id, error: e.to_string() });
                }
            }
        }

        tracing::info!(
            uid = %self.session.uid,
            deleted = report.deleted.len(),
            failed = report.failed.len(),
            "Bulk delete finished"
        );
        Ok(DeleteOutcome::Completed {
            message: report.message(),
            report,
        })
    }

    // ───── Wizard ────────────────────────────────────────────────────

    fn apply(&self, action: WizardAction) -> Result<WizardState, WizardError> {
        let mut state = self.wizard.lock();
        let next = transition(&state, action)?;
        *state = next.clone();
        Ok(next)
    }

    pub fn open_new(&self) -> Result<WizardState, WizardError> {
        self.apply(WizardAction::OpenNew {
            uid: self.session.uid.clone(),
            now: Utc::now(),
        })
    }

    pub fn open_edit(&self, plant_id: &str) -> Result<WizardState, WizardError> {
        let record = self
            .live
            .read()
            .records
            .iter()
            .find(|record| record.id == plant_id)
            .cloned()
            .ok_or_else(|| WizardError::UnknownPlant(plant_id.to_string()))?;

        self.apply(WizardAction::OpenEdit {
            record: Box::new(record),
            uid: self.session.uid.clone(),
            now: Utc::now(),
        })
    }

    pub fn update_draft(&self, patch: DraftPatch) -> Result<WizardState, WizardError> {
        self.apply(WizardAction::Update(patch))
    }

    pub fn scan(&self, code: String) -> Result<WizardState, WizardError> {
        self.close_scanner();
        self.apply(WizardAction::ScanSucceeded(code))
    }

    pub fn attach_photo(&self, upload: ImageUpload) -> Result<WizardState, WizardError> {
        if !self.wizard.lock().is_open() {
            return Err(WizardError::NotOpen);
        }
        let data_url = upload.into_data_url(self.max_image_bytes)?;
        self.apply(WizardAction::PhotoCaptured(data_url))
    }

    /// Resolves the coordinates to an address and stores both on the draft.
    pub async fn capture_location(&self, latitude: f64, longitude: f64) -> Result<WizardState, WizardError> {
        if !self.wizard.lock().is_open() {
            return Err(WizardError::NotOpen);
        }
        let address = self.geocoder.reverse(latitude, longitude).await;
        self.apply(WizardAction::LocationCaptured { latitude, longitude, address })
    }

    pub fn next_step(&self) -> Result<WizardState, WizardError> {
        self.apply(WizardAction::Next)
    }

    pub fn previous_step(&self) -> Result<WizardState, WizardError> {
        self.apply(WizardAction::Previous)
    }

    pub fn exit(&self, confirmed: bool) -> Result<WizardState, WizardError> {
        let state = self.apply(WizardAction::RequestExit { confirmed })?;
        if !state.is_open() {
            self.close_scanner();
        }
        Ok(state)
    }

    /// Writes the draft under its id, merging into any existing document.
    pub async fn submit(&self) -> Result<SubmitReceipt, DashboardError> {
        let draft = self.apply(WizardAction::BeginSubmit)?.draft;
        let record = draft.to_record(&self.session.uid, Utc::now().date_naive());

        let result = self
            .store
            .upsert(&self.path, &record.id, &record, WriteOptions::default())
            .await;

        if let Err(e) = self.apply(WizardAction::SubmitFinished { ok: result.is_ok() }) {
            tracing::warn!("Wizard changed while submitting: {}", e);
        }

        match result {
            Ok(()) => {
                self.close_scanner();
                tracing::info!(uid = %self.session.uid, plant_id = %record.id, "Plant submitted");
                let label = if record.name.is_empty() { &record.id } else { &record.name };
                Ok(SubmitReceipt {
                    message: format!("Success! Plant \"{label}\" has been added/updated."),
                    id: record.id,
                })
            }
            Err(e) => {
                tracing::error!(plant_id = %record.id, "Submission error: {}", e);
                Err(e.into())
            }
        }
    }

    // ───── QR scanning ───────────────────────────────────────────────

    /// Wires a camera to the form. A decoded code lands in the draft's id.
    pub fn attach_scanner(self: &Arc<Self>, scanner: Arc<dyn CameraScanner>, mount: Arc<dyn MountPoint>) -> Arc<QrCapture> {
        let weak = Arc::downgrade(self);
        let capture = Arc::new(QrCapture::new(scanner, move |code: String| {
            if let Some(dashboard) = weak.upgrade() {
                if let Err(e) = dashboard.apply(WizardAction::ScanSucceeded(code)) {
                    tracing::warn!("Scanned code dropped: {}", e);
                }
            }
        }));
        capture.attach(mount);

        let previous = self.capture.lock().replace(Arc::clone(&capture));
        if let Some(previous) = previous {
            previous.close();
        }
        capture
    }

    pub fn scanner(&self) -> Option<Arc<QrCapture>> {
        self.capture.lock().clone()
    }

    pub fn close_scanner(&self) {
        let capture = self.capture.lock().take();
        if let Some(capture) = capture {
            capture.close();
        }
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// Mounted dashboards, one per signed-in user.
#[derive(Clone)]
pub struct DashboardRegistry {
    ctx: DashboardContext,
    dashboards: Arc<DashMap<String, Arc<Dashboard>>>,
}

impl DashboardRegistry {
    pub fn new(ctx: DashboardContext) -> Self {
        DashboardRegistry {
            ctx,
            dashboards: Arc::new(DashMap::new()),
        }
    }

    pub fn get(&self, uid: &str) -> Option<Arc<Dashboard>> {
        self.dashboards
            .get(uid)
            .map(|entry| Arc::clone(entry.value()))
            .filter(|dashboard| dashboard.is_mounted())
    }

    pub async fn get_or_mount(&self, uid: &str) -> Result<Arc<Dashboard>, DashboardError> {
        if let Some(dashboard) = self.get(uid) {
            dashboard.touch();
            return Ok(dashboard);
        }

        let session = self.ctx.auth.current_session(uid).ok_or(AuthError::SessionEnded)?;

        let dashboards = Arc::downgrade(&self.dashboards);
        let hook: TeardownHook = Box::new(move |uid: &str, instance: Uuid| {
            if let Some(dashboards) = dashboards.upgrade() {
                dashboards.remove_if(uid, |_, mounted| mounted.instance == instance);
            }
        });
        let dashboard = Dashboard::mount(&self.ctx, session, Some(hook)).await?;

        let (winner, loser) = match self.dashboards.entry(uid.to_string()) {
            Entry::Occupied(entry) if entry.get().is_mounted() => (Arc::clone(entry.get()), Some(dashboard)),
            Entry::Occupied(mut entry) => {
                entry.insert(Arc::clone(&dashboard));
                (dashboard, None)
            }
            Entry::Vacant(entry) => {
                entry.insert(Arc::clone(&dashboard));
                (dashboard, None)
            }
        };

        if let Some(loser) = loser {
            loser.teardown();
        }
        Ok(winner)
    }

    pub fn unmount(&self, uid: &str) -> bool {
        match self.dashboards.remove(uid) {
            Some((_, dashboard)) => {
                dashboard.teardown();
                true
            }
            None => false,
        }
    }

    /// Unmounts dashboards untouched for longer than `max_idle`.
    pub fn sweep_idle(&self, max_idle: Duration) -> usize {
        let stale: Vec<String> = self
            .dashboards
            .iter()
            .filter(|entry| !entry.is_mounted() || entry.idle_for() > max_idle)
            .map(|entry| entry.key().clone())
            .collect();

        stale.iter().filter(|uid| self.unmount(uid)).count()
    }

    pub fn unmount_all(&self) -> usize {
        let uids: Vec<String> = self.dashboards.iter().map(|entry| entry.key().clone()).collect();
        uids.iter().filter(|uid| self.unmount(uid)).count()
    }

    pub fn len(&self) -> usize {
        self.dashboards.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dashboards.is_empty()
    }
}
