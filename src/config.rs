use std::time::Duration;

use actix_web::cookie::Key;
use envconfig::Envconfig;

use crate::errors::AppError;

#[derive(Envconfig, Clone)]
pub struct Config {
    #[envconfig(from = "API_URL", default = "http://localhost:5000/api/v1")]
    pub api_url: String,

    #[envconfig(from = "SESSION_KEY")]
    pub session_key: String,

    #[envconfig(from = "BIND_ADDR", default = "0.0.0.0")]
    pub bind_addr: String,

    #[envconfig(from = "PORT", default = "8080")]
    pub port: u16,

    #[envconfig(from = "API_TIMEOUT_SECS", default = "30")]
    pub api_timeout_secs: u64,

    #[envconfig(from = "DEFAULT_EXCHANGE_RATE", default = "15000")]
    pub default_exchange_rate: f64,

    #[envconfig(from = "NOTIFICATION_POLL_SECS", default = "30")]
    pub notification_poll_secs: u64,

    #[envconfig(from = "IMPORT_TTL_SECS", default = "1800")]
    pub import_ttl_secs: u64,

    #[envconfig(from = "SECURE_COOKIES", default = "false")]
    pub secure_cookies: bool,
}

impl Config {
    pub fn load() -> Result<Self, AppError> {
        Config::init_from_env().map_err(|e| AppError::ConfigError(e.to_string()))
    }

    /// Cookie signing/encryption key. `Key::from` needs at least 64 bytes.
    pub fn cookie_key(&self) -> Result<Key, AppError> {
        if self.session_key.len() < 64 {
            return Err(AppError::ConfigError(
                "SESSION_KEY must be at least 64 bytes long".to_owned(),
            ));
        }
        Ok(Key::from(self.session_key.as_bytes()))
    }

    pub fn api_timeout(&self) -> Duration {
        Duration::from_secs(self.api_timeout_secs)
    }

    pub fn import_ttl(&self) -> Duration {
        Duration::from_secs(self.import_ttl_secs)
    }
}

#[cfg(test)]
impl Config {
    pub fn for_backend(api_url: &str) -> Self {
        Config {
            api_url: api_url.to_owned(),
            session_key: "k".repeat(64),
            bind_addr: "127.0.0.1".to_owned(),
            port: 0,
            api_timeout_secs: 5,
            default_exchange_rate: 15000.0,
            notification_poll_secs: 30,
            import_ttl_secs: 60,
            secure_cookies: false,
        }
    }
}
