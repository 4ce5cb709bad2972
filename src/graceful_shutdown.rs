use tokio::signal;
use tracing::{error, warn};

use crate::use_cases::dashboard::DashboardRegistry;

/// Resolves on Ctrl+C or SIGTERM. A signal source that cannot be installed
/// is logged and never fires.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            warn!("🛑 Ctrl+C received, initiating shutdown...")
        },
        _ = terminate => {
            warn!("🛑 SIGTERM received, initiating shutdown...");
        }
    }
}

/// Disposes every live subscription before the process exits.
pub fn close_dashboards(dashboards: &DashboardRegistry) {
    let closed = dashboards.unmount_all();
    tracing::info!("Closed {} dashboard(s)", closed);
}
