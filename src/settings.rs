use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use dotenv::dotenv;
use jsonwebtoken::{DecodingKey, EncodingKey};
use std::{env, fmt, str::FromStr};
use zeroize::Zeroizing;

#[derive(Debug, Deserialize, Clone, PartialEq)]
#[serde(rename_all = "lowercase")]
pub enum AppEnvironment {
    Development,
    Production,
    Testing,
}

impl FromStr for AppEnvironment {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "development" => Ok(AppEnvironment::Development),
            "production" => Ok(AppEnvironment::Production),
            "testing" => Ok(AppEnvironment::Testing),
            _ => Err(ConfigError::Message(format!("Invalid environment: {}", s))),
        }
    }
}

#[derive(Deserialize, Clone)]
#[serde(rename_all = "snake_case")]
pub struct AppConfig {
    #[serde(default = "default_env")]
    pub env: AppEnvironment,

    #[serde(default = "default_name")]
    pub name: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_worker_count")]
    pub worker_count: usize,

    /// Segment of every collection path: `artifacts/{app_id}/users/...`
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Postgres document store; the in-memory store is used when absent.
    #[serde(default)]
    pub database_url: Option<String>,

    #[serde(default = "default_cors_origins")]
    pub cors_allowed_origins: Vec<String>,

    #[serde(default)]
    pub jwt_secret: String,

    #[serde(default = "default_jwt_expiration")]
    pub jwt_expiration_minutes: i64,

    #[serde(default = "default_geocode_base_url")]
    pub geocode_base_url: String,

    #[serde(default = "default_geocode_user_agent")]
    pub geocode_user_agent: String,

    #[serde(default = "default_geocode_timeout")]
    pub geocode_timeout_secs: u64,

    #[serde(default = "default_max_image_bytes")]
    pub max_image_bytes: usize,

    #[serde(default = "default_dashboard_idle")]
    pub dashboard_idle_minutes: u64,

    #[serde(default)]
    pub admin_email: Option<String>,

    #[serde(default)]
    pub admin_password: Option<String>,
}

fn default_env() -> AppEnvironment {
    AppEnvironment::Development
}
fn default_name() -> String {
    "Indomitum-Inventory".to_string()
}
fn default_port() -> u16 {
    8080
}
fn default_host() -> String {
    "127.0.0.1".to_string()
}
fn default_worker_count() -> usize {
    num_cpus::get()
}
fn default_app_id() -> String {
    "indomitum".to_string()
}
fn default_cors_origins() -> Vec<String> {
    vec!["*".to_string()]
}
fn default_jwt_expiration() -> i64 {
    60
}
fn default_geocode_base_url() -> String {
    "https://nominatim.openstreetmap.org".to_string()
}
fn default_geocode_user_agent() -> String {
    format!("indomitum-inventory/{}", env!("CARGO_PKG_VERSION"))
}
fn default_geocode_timeout() -> u64 {
    10
}
fn default_max_image_bytes() -> usize {
    5 * 1024 * 1024
}
fn default_dashboard_idle() -> u64 {
    30
}

impl AppConfig {
    pub fn new() -> Result<Self, ConfigError> {
        dotenv().ok();

        let raw_env = env::var("APP_ENV").unwrap_or_else(|_| "development".into());
        let env_name = AppEnvironment::from_str(&raw_env)
            .map_err(|_| ConfigError::Message(format!("Invalid APP_ENV value: {}", raw_env)))?;

        let builder = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", env_name)).required(false))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .ignore_empty(true)
                    .try_parsing(true)
                    .list_separator(",")
                    .with_list_parse_key("cors_allowed_origins"),
            );

        let mut config: Self = builder.build()?.try_deserialize()?;

        config.env = env_name;
        config.jwt_secret = fill_or_env(config.jwt_secret, "APP_JWT_SECRET")?;

        if config.database_url.is_none() {
            config.database_url = env::var("APP_DATABASE_URL").ok().filter(|url| !url.trim().is_empty());
        }
        if config.admin_email.is_none() {
            config.admin_email = env::var("APP_ADMIN_EMAIL").ok();
        }
        if config.admin_password.is_none() {
            config.admin_password = env::var("APP_ADMIN_PASSWORD").ok();
        }

        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let mut errors = Vec::new();

        if self.app_id.trim().is_empty() {
            errors.push("APP_ID cannot be empty");
        }
        if self.jwt_secret.len() < 32 {
            errors.push("JWT_SECRET must be at least 32 characters");
        }
        if url::Url::parse(&self.geocode_base_url).is_err() {
            errors.push("GEOCODE_BASE_URL must be an absolute URL");
        }
        if self.max_image_bytes == 0 {
            errors.push("MAX_IMAGE_BYTES must be greater than zero");
        }
        if self.admin_email.is_some() != self.admin_password.is_some() {
            errors.push("ADMIN_EMAIL and ADMIN_PASSWORD must be set together");
        }
        if self.is_production() && self.cors_origins().iter().any(|o| o == "*") {
            errors.push("Wildcard CORS (*) is not allowed in production");
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Message(errors.join(", ")))
        }
    }

    pub fn is_production(&self) -> bool {
        self.env == AppEnvironment::Production
    }

    pub fn cors_origins(&self) -> Vec<String> {
        self.cors_allowed_origins
            .iter()
            .flat_map(|origin| origin.split(','))
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect()
    }
}

fn fill_or_env(current: String, env_key: &str) -> Result<String, ConfigError> {
    if current.trim().is_empty() {
        env::var(env_key).map_err(|_| ConfigError::Message(format!("{env_key} must be set")))
    } else {
        Ok(current)
    }
}

impl fmt::Display for AppEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AppEnvironment::Development => "development",
            AppEnvironment::Production => "production",
            AppEnvironment::Testing => "testing",
        };
        write!(f, "{s}")
    }
}

trait Redact {
    fn redact(&self) -> &str;
}

impl Redact for str {
    fn redact(&self) -> &str {
        if self.is_empty() {
            "[MISSING]"
        } else if self.len() < 32 {
            "[TOO_SHORT]"
        } else {
            "[REDACTED]"
        }
    }
}

impl Redact for Option<String> {
    fn redact(&self) -> &str {
        match self {
            Some(_) => "[REDACTED]",
            None => "[NOT SET]",
        }
    }
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("env", &self.env)
            .field("name", &self.name)
            .field("port", &self.port)
            .field("host", &self.host)
            .field("worker_count", &self.worker_count)
            .field("app_id", &self.app_id)
            .field("database_url", &self.database_url.redact())
            .field("cors_allowed_origins", &self.cors_allowed_origins)
            .field("jwt_secret", &self.jwt_secret.as_str().redact())
            .field("jwt_expiration_minutes", &self.jwt_expiration_minutes)
            .field("geocode_base_url", &self.geocode_base_url)
            .field("geocode_timeout_secs", &self.geocode_timeout_secs)
            .field("max_image_bytes", &self.max_image_bytes)
            .field("dashboard_idle_minutes", &self.dashboard_idle_minutes)
            .field("admin_email", &self.admin_email)
            .field("admin_password", &self.admin_password.redact())
            .finish()
    }
}

#[derive(Clone)]
pub struct JwtKeys {
    pub encoding: EncodingKey,
    pub decoding: DecodingKey,
}

impl From<&AppConfig> for JwtKeys {
    fn from(config: &AppConfig) -> Self {
        let jwt_secret = Zeroizing::new(config.jwt_secret.clone());

        JwtKeys {
            encoding: EncodingKey::from_secret(jwt_secret.as_bytes()),
            decoding: DecodingKey::from_secret(jwt_secret.as_bytes()),
        }
    }
}

impl fmt::Debug for JwtKeys {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JwtKeys")
            .field("encoding", &"[REDACTED]")
            .field("decoding", &"[REDACTED]")
            .finish()
    }
}
