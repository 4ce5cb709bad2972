use std::sync::Arc;

mod domain;
mod interfaces;
mod infrastructure;
pub mod errors;
pub mod settings;
pub mod constants;
pub mod graceful_shutdown;
pub mod background_task;

pub use domain::{device, entities, use_cases};
pub use interfaces::{handlers, repositories, middlewares, routes};
pub use infrastructure::{auth, db, geocode};

use auth::jwt::JwtService;
use errors::AuthError;
use geocode::nominatim::NominatimGeocoder;
use repositories::{
    auth_provider::{AuthProvider, InMemoryAuthProvider},
    geocoder::ReverseGeocoder,
    memory_store::MemoryDocumentStore,
    pg_store::PgDocumentStore,
    plant_store::DocumentStore,
};
use settings::AppConfig;
use use_cases::{
    auth::AuthHandler,
    dashboard::{DashboardContext, DashboardRegistry},
};

pub struct AppState {
    pub auth_handler: AppAuthHandler,
    pub store: Arc<dyn DocumentStore>,
    pub dashboards: DashboardRegistry,
}

pub type AppAuthHandler = AuthHandler<JwtService>;

impl AppState {
    pub fn new(
        config: &AppConfig,
        store: Arc<dyn DocumentStore>,
        provider: Arc<dyn AuthProvider>,
        geocoder: Arc<dyn ReverseGeocoder>,
    ) -> Self {
        let jwt_service = JwtService::new(config);
        let auth_handler = AuthHandler::new(Arc::clone(&provider), jwt_service);

        let dashboards = DashboardRegistry::new(DashboardContext {
            app_id: config.app_id.clone(),
            store: Arc::clone(&store),
            auth: provider,
            geocoder,
            max_image_bytes: config.max_image_bytes,
        });

        AppState {
            auth_handler,
            store,
            dashboards,
        }
    }

    /// Wires the production collaborators: Postgres documents when a
    /// database is configured (in-process otherwise) and Nominatim lookups.
    pub async fn from_config(config: &AppConfig, provider: Arc<dyn AuthProvider>) -> Result<Self, sqlx::Error> {
        let store: Arc<dyn DocumentStore> = match &config.database_url {
            Some(url) => Arc::new(PgDocumentStore::new(db::postgres::create_pool(url).await?)),
            None => {
                tracing::warn!("No database configured, plants are kept in memory only");
                Arc::new(MemoryDocumentStore::new())
            }
        };
        let geocoder: Arc<dyn ReverseGeocoder> = Arc::new(NominatimGeocoder::from_config(config));

        Ok(Self::new(config, store, provider, geocoder))
    }
}

/// Registers the configured admin account, if any, with the `admin` role.
pub fn seed_admin_account(config: &AppConfig, provider: &InMemoryAuthProvider) -> Result<Option<String>, AuthError> {
    let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) else {
        return Ok(None);
    };

    let uid = provider.register_user(email, password, Some("admin"))?;
    tracing::info!(uid = %uid, "Seeded admin account");
    Ok(Some(uid))
}
