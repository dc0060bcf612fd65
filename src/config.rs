use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::persist::default_db_path;

pub const DEFAULT_BASE_URL: &str = "https://v3.football.api-sports.io";
pub const DEFAULT_SEASON: u16 = 2024;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 5 * 60;
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

#[derive(Debug, Clone)]
pub struct ApiConfig {
    pub base_url: String,
    pub api_key: Option<String>,
    pub season: u16,
    pub cache_ttl: Duration,
    pub request_timeout: Duration,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            api_key: None,
            season: DEFAULT_SEASON,
            cache_ttl: Duration::from_secs(DEFAULT_CACHE_TTL_SECS),
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct EmailConfig {
    pub api_key: String,
    pub from_email: String,
    pub from_name: String,
}

#[derive(Debug, Clone, Default)]
pub struct WhatsAppConfig {
    pub account_sid: String,
    pub auth_token: String,
    pub from_number: String,
}

#[derive(Debug, Clone, Default)]
pub struct AppConfig {
    pub api: ApiConfig,
    pub db_path: Option<PathBuf>,
    pub email: Option<EmailConfig>,
    pub whatsapp: Option<WhatsAppConfig>,
}

impl AppConfig {
    /// Reads the process environment. Call `load_dotenv` first to pick up `.env` files.
    pub fn from_env() -> Self {
        let api = ApiConfig {
            base_url: opt_env("FOOTBALL_API_BASE_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            api_key: opt_env("FOOTBALL_API_KEY"),
            season: env::var("FOOTBALL_SEASON")
                .ok()
                .and_then(|val| val.parse::<u16>().ok())
                .unwrap_or(DEFAULT_SEASON),
            cache_ttl: Duration::from_secs(
                env::var("API_CACHE_TTL_SECS")
                    .ok()
                    .and_then(|val| val.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_CACHE_TTL_SECS)
                    .max(1),
            ),
            request_timeout: Duration::from_secs(
                env::var("API_TIMEOUT_SECS")
                    .ok()
                    .and_then(|val| val.parse::<u64>().ok())
                    .unwrap_or(DEFAULT_TIMEOUT_SECS)
                    .clamp(1, 60),
            ),
        };

        let email = opt_env("SENDGRID_API_KEY")
            .filter(|key| key.starts_with("SG."))
            .map(|api_key| EmailConfig {
                api_key,
                from_email: opt_env("FROM_EMAIL")
                    .unwrap_or_else(|| "noreply@fcdescansa.com".to_string()),
                from_name: opt_env("FROM_NAME").unwrap_or_else(|| "FC Descansa".to_string()),
            });

        let whatsapp = match (
            opt_env("TWILIO_ACCOUNT_SID").filter(|sid| sid.starts_with("AC")),
            opt_env("TWILIO_AUTH_TOKEN"),
            opt_env("TWILIO_WHATSAPP_NUMBER"),
        ) {
            (Some(account_sid), Some(auth_token), Some(from_number)) => Some(WhatsAppConfig {
                account_sid,
                auth_token,
                from_number,
            }),
            _ => None,
        };

        Self {
            api,
            db_path: opt_env("FC_DB_PATH").map(PathBuf::from).or_else(default_db_path),
            email,
            whatsapp,
        }
    }
}

pub fn load_dotenv() {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
}

fn opt_env(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .and_then(|val| if val.trim().is_empty() { None } else { Some(val.trim().to_string()) })
}
