use serde::Deserialize;
use service_core::config::{self as core_config, get_env, get_env_flag, get_env_u64};
use service_core::error::AppError;
use std::env;
use std::fmt;
use std::str::FromStr;

pub const DEFAULT_FCM_API_BASE_URL: &str = "https://fcm.googleapis.com";
pub const DEFAULT_FCM_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

#[derive(Debug, Clone, Deserialize)]
pub struct RelayConfig {
    #[serde(flatten)]
    pub common: core_config::Config,
    pub environment: Environment,
    pub service_name: String,
    pub log_level: String,
    pub otlp_endpoint: Option<String>,
    pub mongodb: MongoConfig,
    pub fcm: FcmConfig,
    pub cors: CorsConfig,
}

#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Development,
    Production,
}

#[derive(Debug, Clone, Deserialize)]
pub struct MongoConfig {
    pub uri: String,
    pub database: String,
    pub timeout_secs: u64,
}

#[derive(Clone, Deserialize)]
pub struct FcmConfig {
    pub project_id: String,
    pub client_email: String,
    pub private_key: String,
    pub enabled: bool,
    pub api_base_url: String,
    pub token_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CorsConfig {
    /// Empty means any origin.
    pub allowed_origins: Vec<String>,
}

impl RelayConfig {
    pub fn load() -> Result<Self, AppError> {
        let common_config = core_config::Config::load()?;
        let environment: Environment = get_env("ENVIRONMENT", Some("production"))?
            .parse()
            .map_err(|e: String| AppError::ConfigError(anyhow::anyhow!(e)))?;
        let is_prod = environment == Environment::Production;

        let fcm_enabled = get_env_flag("FCM_ENABLED", is_prod);
        let fcm_default = if fcm_enabled { None } else { Some("") };

        Ok(RelayConfig {
            common: common_config,
            environment,
            service_name: get_env("SERVICE_NAME", Some("relay-service"))?,
            log_level: get_env("LOG_LEVEL", Some("info"))?,
            otlp_endpoint: env::var("OTLP_ENDPOINT").ok().filter(|v| !v.is_empty()),
            mongodb: MongoConfig {
                uri: get_env("MONGODB_URI", None)?,
                database: get_env("MONGODB_DATABASE", Some("push_relay"))?,
                timeout_secs: get_env_u64("MONGODB_TIMEOUT_SECS", 10),
            },
            fcm: FcmConfig {
                project_id: get_env("FIREBASE_PROJECT_ID", fcm_default)?,
                client_email: get_env("FIREBASE_CLIENT_EMAIL", fcm_default)?,
                private_key: normalize_private_key(&get_env("FIREBASE_PRIVATE_KEY", fcm_default)?),
                enabled: fcm_enabled,
                api_base_url: get_env("FCM_API_BASE_URL", Some(DEFAULT_FCM_API_BASE_URL))?,
                token_url: get_env("FCM_TOKEN_URL", Some(DEFAULT_FCM_TOKEN_URL))?,
                timeout_secs: get_env_u64("FCM_TIMEOUT_SECS", 10),
            },
            cors: CorsConfig {
                allowed_origins: parse_origins(&env::var("ALLOWED_ORIGINS").unwrap_or_default()),
            },
        })
    }

    /// Whether the device listing/deletion routes are mounted.
    pub fn maintenance_enabled(&self) -> bool {
        self.environment == Environment::Development
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "dev" | "development" => Ok(Environment::Development),
            "prod" | "production" => Ok(Environment::Production),
            _ => Err(format!("Invalid environment: {}", s)),
        }
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Environment::Development => write!(f, "development"),
            Environment::Production => write!(f, "production"),
        }
    }
}

impl fmt::Debug for FcmConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FcmConfig")
            .field("project_id", &self.project_id)
            .field("client_email", &self.client_email)
            .field("private_key", &"<redacted>")
            .field("enabled", &self.enabled)
            .field("api_base_url", &self.api_base_url)
            .field("token_url", &self.token_url)
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// Service-account keys pasted into env files usually carry literal `\n`.
fn normalize_private_key(raw: &str) -> String {
    raw.replace("\\n", "\n")
}

fn parse_origins(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|origin| !origin.is_empty())
        .map(str::to_string)
        .collect()
}
