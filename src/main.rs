use std::{sync::Arc, time::Duration};

use actix_cors::Cors;
use actix_web::{http::header, middleware::NormalizePath, web, App, HttpServer};
use indomitum_inventory::{
    background_task::start_idle_sweep_task,
    constants::START_TIME,
    graceful_shutdown::{close_dashboards, shutdown_signal},
    middlewares::auth::AuthMiddleware,
    repositories::auth_provider::InMemoryAuthProvider,
    routes::configure_routes,
    seed_admin_account,
    settings::AppConfig,
    AppState,
};
use tracing_actix_web::TracingLogger;
use tracing_subscriber::EnvFilter;

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn build_cors(origins: &[String]) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "PATCH", "DELETE", "OPTIONS"])
        .allowed_headers(vec![header::AUTHORIZATION, header::CONTENT_TYPE, header::ACCEPT])
        .expose_headers(vec![header::CONTENT_DISPOSITION])
        .max_age(3600);

    if origins.iter().any(|o| o == "*") {
        return cors.allow_any_origin();
    }
    origins.iter().fold(cors, |cors, origin| cors.allowed_origin(origin))
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    once_cell::sync::Lazy::force(&START_TIME);

    let config = match AppConfig::new() {
        Ok(cfg) => cfg,
        Err(e) => {
            init_tracing(false);
            tracing::error!("Configuration error: {}", e);
            std::process::exit(1);
        }
    };
    init_tracing(config.is_production());
    tracing::info!("Loaded configuration: {:?}", config);

    let provider = Arc::new(InMemoryAuthProvider::new());
    if let Err(e) = seed_admin_account(&config, &provider) {
        tracing::error!("Failed to seed admin account: {}", e);
        std::process::exit(1);
    }

    let state = match AppState::from_config(&config, provider).await {
        Ok(state) => state,
        Err(e) => {
            tracing::error!("Failed to connect to the document database: {}", e);
            std::process::exit(1);
        }
    };
    let app_state = web::Data::new(state);

    let server_addr = format!("{}:{}", config.host, config.port);
    tracing::info!(
        "🚀 Starting {} v{} on {}",
        config.name,
        env!("CARGO_PKG_VERSION"),
        server_addr
    );

    let origins = config.cors_origins();
    let server_state = app_state.clone();
    let server = HttpServer::new(move || {
        App::new()
            .app_data(server_state.clone())
            .wrap(AuthMiddleware)
            .wrap(NormalizePath::trim())
            .wrap(build_cors(&origins))
            .wrap(TracingLogger::default())
            .configure(configure_routes)
    })
    .workers(config.worker_count)
    .bind(server_addr)?
    .disable_signals()
    .run();

    let server_handle = server.handle();
    let sweep = tokio::spawn(start_idle_sweep_task(
        app_state.dashboards.clone(),
        Duration::from_secs(config.dashboard_idle_minutes * 60),
    ));

    let result = tokio::select! {
        res = server => res,
        _ = shutdown_signal() => {
            server_handle.stop(true).await;
            Ok(())
        }
    };

    sweep.abort();
    close_dashboards(&app_state.dashboards);
    tracing::info!("Shutdown complete");
    result
}
