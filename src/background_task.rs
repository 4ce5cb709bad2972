use tokio::time::{interval, Duration};

use crate::use_cases::dashboard::DashboardRegistry;

const SWEEP_EVERY: Duration = Duration::from_secs(60);

/// Unmounts dashboards nobody has touched for `max_idle`, releasing their
/// store and auth subscriptions.
pub async fn start_idle_sweep_task(dashboards: DashboardRegistry, max_idle: Duration) {
    let mut interval = interval(SWEEP_EVERY);

    loop {
        interval.tick().await;

        let swept = dashboards.sweep_idle(max_idle);
        if swept > 0 {
            tracing::info!("Unmounted {} idle dashboard(s)", swept);
        }
    }
}
