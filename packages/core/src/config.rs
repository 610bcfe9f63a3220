use std::env;

use chrono::Duration;

pub const DEFAULT_FREE_UPLOAD_LIMIT: u32 = 5;
pub const DEFAULT_REVIEW_PERIOD_HOURS: i64 = 48;
pub const DEFAULT_WEBHOOK_TOLERANCE_SECS: i64 = 300;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {name}: {value}")]
    InvalidValue { name: &'static str, value: String },
}

/// Business constants of the gating policy.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PolicyConfig {
    /// Apps a device may submit before a subscription is required.
    pub free_upload_limit: u32,
    /// Delay before a pending app becomes downloadable on its own.
    pub review_period: Duration,
}

impl Default for PolicyConfig {
    fn default() -> Self {
        Self {
            free_upload_limit: DEFAULT_FREE_UPLOAD_LIMIT,
            review_period: Duration::hours(DEFAULT_REVIEW_PERIOD_HOURS),
        }
    }
}

impl PolicyConfig {
    /// Reads `FREE_UPLOAD_LIMIT` and `REVIEW_PERIOD_HOURS`, falling back to the
    /// defaults when unset.
    pub fn from_env() -> Result<Self, ConfigError> {
        let free_upload_limit =
            parse_env("FREE_UPLOAD_LIMIT")?.unwrap_or(DEFAULT_FREE_UPLOAD_LIMIT);
        let review_hours: i64 =
            parse_env("REVIEW_PERIOD_HOURS")?.unwrap_or(DEFAULT_REVIEW_PERIOD_HOURS);

        Ok(Self {
            free_upload_limit,
            review_period: non_negative("REVIEW_PERIOD_HOURS", review_hours, Duration::try_hours)?,
        })
    }
}

/// Settings for authenticating payment-provider webhooks.
#[derive(Clone, Debug)]
pub struct WebhookConfig {
    pub secret: String,
    /// Maximum age (and clock skew) accepted for a signed timestamp.
    pub tolerance: Duration,
}

impl WebhookConfig {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            tolerance: Duration::seconds(DEFAULT_WEBHOOK_TOLERANCE_SECS),
        }
    }

    /// `None` when `STRIPE_WEBHOOK_SECRET` is unset; the webhook endpoint then
    /// reports itself as unavailable.
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Some(secret) = env::var("STRIPE_WEBHOOK_SECRET")
            .ok()
            .filter(|s| !s.is_empty())
        else {
            return Ok(None);
        };

        let tolerance = parse_env("STRIPE_WEBHOOK_TOLERANCE_SECS")?
            .unwrap_or(DEFAULT_WEBHOOK_TOLERANCE_SECS);

        Ok(Some(Self {
            secret,
            tolerance: non_negative(
                "STRIPE_WEBHOOK_TOLERANCE_SECS",
                tolerance,
                Duration::try_seconds,
            )?,
        }))
    }
}

/// Negative or unrepresentable amounts are configuration errors.
fn non_negative(
    name: &'static str,
    amount: i64,
    to_duration: fn(i64) -> Option<Duration>,
) -> Result<Duration, ConfigError> {
    to_duration(amount)
        .filter(|duration| *duration >= Duration::zero())
        .ok_or(ConfigError::InvalidValue {
            name,
            value: amount.to_string(),
        })
}

fn parse_env<T: std::str::FromStr>(name: &'static str) -> Result<Option<T>, ConfigError> {
    match env::var(name) {
        Ok(value) if !value.trim().is_empty() => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { name, value }),
        _ => Ok(None),
    }
}
