use std::env;
use tracing::warn;

const DEFAULT_API_URL: &str = "http://localhost:8080";
const DEFAULT_TIMEOUT_SECS: u64 = 10;
const DEFAULT_HORIZON_DAYS: i64 = 30;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub api_base_url: String,
    pub request_timeout_secs: u64,
    pub booking_horizon_days: i64,
    pub session_jwt_secret: Option<String>,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_URL.to_string(),
            request_timeout_secs: DEFAULT_TIMEOUT_SECS,
            booking_horizon_days: DEFAULT_HORIZON_DAYS,
            session_jwt_secret: None,
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Self {
        let config = Self {
            api_base_url: env::var("BOOKING_API_URL")
                .map(|url| url.trim_end_matches('/').to_string())
                .unwrap_or_else(|_| {
                    warn!("BOOKING_API_URL not set, using {}", DEFAULT_API_URL);
                    DEFAULT_API_URL.to_string()
                }),
            request_timeout_secs: parse_var("BOOKING_API_TIMEOUT_SECS", DEFAULT_TIMEOUT_SECS),
            booking_horizon_days: parse_var("BOOKING_HORIZON_DAYS", DEFAULT_HORIZON_DAYS),
            session_jwt_secret: env::var("SESSION_JWT_SECRET")
                .ok()
                .filter(|secret| !secret.is_empty())
                .or_else(|| {
                    warn!("SESSION_JWT_SECRET not set, session tokens will not be signature-checked");
                    None
                }),
        };

        if !config.is_configured() {
            warn!("Application not fully configured - missing environment variables");
        }

        config
    }

    pub fn is_configured(&self) -> bool {
        !self.api_base_url.is_empty()
    }

    pub fn verifies_session_signature(&self) -> bool {
        self.session_jwt_secret.is_some()
    }
}

fn parse_var<T: std::str::FromStr + std::fmt::Display>(name: &str, default: T) -> T {
    match env::var(name) {
        Ok(raw) => raw.parse().unwrap_or_else(|_| {
            warn!("{} has invalid value '{}', using {}", name, raw, default);
            default
        }),
        Err(_) => {
            warn!("{} not set, using default {}", name, default);
            default
        }
    }
}
