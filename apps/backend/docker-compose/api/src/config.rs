use std::env;

pub const DEFAULT_PORT: u16 = 3000;

#[derive(Clone, Debug)]
pub struct Config {
    pub port: u16,
    pub sentry_endpoint: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = match env::var("PORT") {
            Ok(value) if !value.trim().is_empty() => value
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidValue(format!("PORT: {value}")))?,
            _ => DEFAULT_PORT,
        };

        Ok(Config {
            port,
            sentry_endpoint: env::var("SENTRY_ENDPOINT").ok().filter(|v| !v.is_empty()),
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for: {0}")]
    InvalidValue(String),
}
