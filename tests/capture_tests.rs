use std::sync::{
    atomic::{AtomicBool, AtomicUsize, Ordering},
    Arc,
};

use async_trait::async_trait;
use indomitum_inventory::{
    errors::CaptureError,
    use_cases::capture::{
        CameraScanner, CaptureState, FacingMode, FrameResult, MountElement, MountPoint, QrCapture,
        ScanConfig, INITIALIZING_TEXT,
    },
};
use parking_lot::Mutex;
use tokio::sync::{Notify, Semaphore};

#[derive(Default)]
struct FakeMount {
    elements: Mutex<Vec<MountElement>>,
}

impl FakeMount {
    fn render(&self) {
        let mut elements = self.elements.lock();
        elements.push(MountElement::Video);
        elements.push(MountElement::Canvas);
    }

    fn is_empty(&self) -> bool {
        self.elements.lock().is_empty()
    }
}

impl MountPoint for FakeMount {
    fn id(&self) -> &str {
        "reader"
    }

    fn remove_element(&self, element: MountElement) -> bool {
        let mut elements = self.elements.lock();
        let before = elements.len();
        elements.retain(|e| *e != element);
        elements.len() != before
    }

    fn has_element(&self, element: MountElement) -> bool {
        self.elements.lock().contains(&element)
    }
}

struct FakeScanner {
    mount: Arc<FakeMount>,
    starts: Mutex<Vec<(String, FacingMode, ScanConfig)>>,
    start_error: Option<CaptureError>,
    stop_calls: AtomicUsize,
    stop_finished: AtomicBool,
    hold_stop: bool,
    release_stop: Notify,
    start_gate: Option<Semaphore>,
}

impl FakeScanner {
    fn new(mount: Arc<FakeMount>) -> Self {
        FakeScanner {
            mount,
            starts: Mutex::new(Vec::new()),
            start_error: None,
            stop_calls: AtomicUsize::new(0),
            stop_finished: AtomicBool::new(false),
            hold_stop: false,
            release_stop: Notify::new(),
            start_gate: None,
        }
    }

    /// Each `start` waits for one `open_gate` before the camera comes up.
    fn gated(mount: Arc<FakeMount>) -> Self {
        FakeScanner {
            start_gate: Some(Semaphore::new(0)),
            ..FakeScanner::new(mount)
        }
    }

    fn open_gate(&self) {
        if let Some(gate) = &self.start_gate {
            gate.add_permits(1);
        }
    }

    fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    fn failing(mount: Arc<FakeMount>, error: CaptureError) -> Self {
        FakeScanner {
            start_error: Some(error),
            ..FakeScanner::new(mount)
        }
    }

    fn slow_to_stop(mount: Arc<FakeMount>) -> Self {
        FakeScanner {
            hold_stop: true,
            ..FakeScanner::new(mount)
        }
    }
}

#[async_trait]
impl CameraScanner for FakeScanner {
    async fn start(&self, mount_id: &str, facing: FacingMode, config: ScanConfig) -> Result<(), CaptureError> {
        self.starts.lock().push((mount_id.to_string(), facing, config));
        if let Some(gate) = &self.start_gate {
            gate.acquire().await.unwrap().forget();
        }
        if let Some(error) = &self.start_error {
            return Err(error.clone());
        }
        self.mount.render();
        Ok(())
    }

    async fn stop(&self) -> Result<(), CaptureError> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.hold_stop {
            self.release_stop.notified().await;
        }
        self.stop_finished.store(true, Ordering::SeqCst);
        Ok(())
    }
}

fn recorder() -> (Arc<Mutex<Vec<String>>>, impl FnOnce(String) + Send + 'static) {
    let codes = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&codes);
    (codes, move |code: String| sink.lock().push(code))
}

async fn settle() {
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }
}

async fn scanning(scanner: Arc<FakeScanner>, mount: Arc<FakeMount>) -> (QrCapture, Arc<Mutex<Vec<String>>>) {
    let (codes, on_success) = recorder();
    let capture = QrCapture::new(scanner, on_success);
    capture.attach(mount);
    capture.start().await.unwrap();
    (capture, codes)
}

#[actix_rt::test]
async fn start_without_mount_point_fails() {
    let scanner = Arc::new(FakeScanner::new(Arc::new(FakeMount::default())));
    let capture = QrCapture::new(scanner.clone(), |_| {});

    assert_eq!(capture.start().await, Err(CaptureError::NotMounted));
    assert!(scanner.starts.lock().is_empty());
    assert_eq!(capture.state(), CaptureState::Uninitialized);
}

#[actix_rt::test]
async fn start_uses_rear_camera_and_scan_settings() {
    let mount = Arc::new(FakeMount::default());
    let scanner = Arc::new(FakeScanner::new(mount.clone()));
    let (capture, _) = scanning(scanner.clone(), mount.clone()).await;

    assert_eq!(capture.state(), CaptureState::Scanning);
    assert_eq!(capture.status_text(), None);
    assert_eq!(
        scanner.starts.lock().as_slice(),
        &[("reader".to_string(), FacingMode::Environment, ScanConfig { fps: 15, qrbox: 250 })]
    );
    assert!(mount.has_element(MountElement::Video));
}

#[actix_rt::test]
async fn starting_an_active_scanner_is_a_no_op() {
    let mount = Arc::new(FakeMount::default());
    let scanner = Arc::new(FakeScanner::new(mount.clone()));
    let (capture, _) = scanning(scanner.clone(), mount).await;

    capture.start().await.unwrap();
    assert_eq!(scanner.starts.lock().len(), 1);
}

#[actix_rt::test]
async fn camera_failure_is_reported_inline() {
    let mount = Arc::new(FakeMount::default());
    let scanner = Arc::new(FakeScanner::failing(
        mount.clone(),
        CaptureError::CameraStart("Permission denied".into()),
    ));
    let capture = QrCapture::new(scanner, |_| {});
    capture.attach(mount);

    assert_eq!(capture.status_text().as_deref(), Some(INITIALIZING_TEXT));
    assert!(capture.start().await.is_err());
    assert_eq!(capture.state(), CaptureState::Error);
    assert_eq!(
        capture.error_message().as_deref(),
        Some("Failed to start camera: Permission denied")
    );
    assert_eq!(capture.status_text(), capture.error_message());
}

#[actix_rt::test]
async fn frames_without_a_code_are_not_errors() {
    let mount = Arc::new(FakeMount::default());
    let scanner = Arc::new(FakeScanner::new(mount.clone()));
    let (capture, codes) = scanning(scanner, mount).await;

    capture.handle_frame(FrameResult::Miss).await;
    capture.handle_frame(FrameResult::Error("NotFoundException: No MultiFormat Readers".into())).await;
    capture.handle_frame(FrameResult::Error("No QR code found".into())).await;

    assert_eq!(capture.error_message(), None);
    assert_eq!(capture.state(), CaptureState::Scanning);
    assert!(codes.lock().is_empty());

    capture.handle_frame(FrameResult::Error("decoder crashed".into())).await;
    assert_eq!(capture.error_message().as_deref(), Some("Scanner error: decoder crashed"));
}

#[actix_rt::test]
async fn decoded_code_is_delivered_once_and_stops_camera() {
    let mount = Arc::new(FakeMount::default());
    let scanner = Arc::new(FakeScanner::new(mount.clone()));
    let (capture, codes) = scanning(scanner.clone(), mount).await;

    capture.handle_frame(FrameResult::Decoded("PLANT-42".into())).await;
    capture.handle_frame(FrameResult::Decoded("PLANT-43".into())).await;

    assert_eq!(codes.lock().as_slice(), &["PLANT-42".to_string()]);
    assert_eq!(capture.state(), CaptureState::Success);
    assert_eq!(scanner.stop_calls.load(Ordering::SeqCst), 1);
}

#[actix_rt::test]
async fn closing_mid_scan_clears_preview_before_stop_finishes() {
    let mount = Arc::new(FakeMount::default());
    let scanner = Arc::new(FakeScanner::slow_to_stop(mount.clone()));
    let (capture, _) = scanning(scanner.clone(), mount.clone()).await;
    assert!(!mount.is_empty());

    capture.close();

    assert!(mount.is_empty());
    assert_eq!(capture.state(), CaptureState::Stopped);

    settle().await;
    assert_eq!(scanner.stop_calls.load(Ordering::SeqCst), 1);
    assert!(!scanner.stop_finished.load(Ordering::SeqCst));

    scanner.release_stop.notify_one();
    settle().await;
    assert!(scanner.stop_finished.load(Ordering::SeqCst));
}

fn start_in_background(capture: &Arc<QrCapture>) -> tokio::task::JoinHandle<Result<(), CaptureError>> {
    let capture = Arc::clone(capture);
    tokio::spawn(async move { capture.start().await })
}

#[actix_rt::test]
async fn closing_while_the_camera_starts_removes_the_late_preview() {
    let mount = Arc::new(FakeMount::default());
    let scanner = Arc::new(FakeScanner::gated(mount.clone()));
    let capture = Arc::new(QrCapture::new(scanner.clone(), |_| {}));
    capture.attach(mount.clone());

    let pending = start_in_background(&capture);
    settle().await;
    assert_eq!(capture.state(), CaptureState::Starting);

    capture.close();
    assert_eq!(capture.state(), CaptureState::Stopped);

    scanner.open_gate();
    pending.await.unwrap().unwrap();

    assert!(!mount.has_element(MountElement::Video));
    assert!(!mount.has_element(MountElement::Canvas));
    assert_eq!(capture.state(), CaptureState::Stopped);

    settle().await;
    assert_eq!(scanner.stops(), 1);
}

#[actix_rt::test]
async fn superseded_start_leaves_the_newer_stream_running() {
    let mount = Arc::new(FakeMount::default());
    let scanner = Arc::new(FakeScanner::gated(mount.clone()));
    let capture = Arc::new(QrCapture::new(scanner.clone(), |_| {}));
    capture.attach(mount.clone());

    let first = start_in_background(&capture);
    settle().await;
    capture.close();
    let second = start_in_background(&capture);
    settle().await;
    assert_eq!(scanner.starts.lock().len(), 2);
    assert_eq!(capture.state(), CaptureState::Starting);

    scanner.open_gate();
    first.await.unwrap().unwrap();
    settle().await;
    assert_eq!(capture.state(), CaptureState::Starting);
    assert_eq!(scanner.stops(), 0);

    scanner.open_gate();
    second.await.unwrap().unwrap();
    settle().await;

    assert_eq!(capture.state(), CaptureState::Scanning);
    assert_eq!(scanner.stops(), 0);
    assert!(mount.has_element(MountElement::Video));
}

#[actix_rt::test]
async fn dropping_the_session_tears_it_down() {
    let mount = Arc::new(FakeMount::default());
    let scanner = Arc::new(FakeScanner::new(mount.clone()));
    let (capture, _) = scanning(scanner.clone(), mount.clone()).await;

    drop(capture);

    assert!(!mount.has_element(MountElement::Video));
    assert!(!mount.has_element(MountElement::Canvas));
    settle().await;
    assert_eq!(scanner.stop_calls.load(Ordering::SeqCst), 1);
}

#[actix_rt::test]
async fn closing_an_idle_session_does_not_touch_the_camera() {
    let mount = Arc::new(FakeMount::default());
    let scanner = Arc::new(FakeScanner::new(mount.clone()));
    let capture = QrCapture::new(scanner.clone(), |_| {});
    capture.attach(mount);

    capture.close();
    settle().await;

    assert_eq!(scanner.stop_calls.load(Ordering::SeqCst), 0);
    assert_eq!(capture.state(), CaptureState::Uninitialized);
}

#[test]
fn stop_races_report_not_found() {
    assert!(CaptureError::Stop("NotFoundError: node was removed".into()).is_not_found());
    assert!(!CaptureError::Stop("device busy".into()).is_not_found());
    assert!(!CaptureError::Scanner("NotFoundError".into()).is_not_found());
}
