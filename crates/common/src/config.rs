use std::time::Duration;

use secrecy::SecretString;

use crate::error::ConfigError;

/// Default SMTP relay used for outcome notifications (implicit TLS).
pub const DEFAULT_SMTP_HOST: &str = "smtp.gmail.com";
pub const DEFAULT_SMTP_PORT: u16 = 465;
/// Longest receive wait SQS accepts.
pub const MAX_WAIT_SECONDS: i32 = 20;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub queue: QueueSettings,
    pub dispatch: DispatchSettings,
    pub smtp: SmtpSettings,
}

/// Where and how the consumer polls.
#[derive(Debug, Clone)]
pub struct QueueSettings {
    /// AWS region hosting the queue
    pub region: String,

    /// Queue name; resolved to a queue URL once at startup
    pub queue_name: String,

    /// Long-poll wait per receive call, in seconds (default: 1)
    pub wait_seconds: i32,

    /// Pause after a failed receive call (default: 1000 ms)
    pub receive_error_backoff: Duration,
}

/// Outbound incident API settings.
#[derive(Debug, Clone)]
pub struct DispatchSettings {
    /// Base URL that relative `url_origin` attributes are joined onto
    pub url_base_incidents: String,

    /// Per-request timeout for the incident API (default: 30s)
    pub http_timeout: Duration,
}

/// Notification transport settings.
#[derive(Debug, Clone)]
pub struct SmtpSettings {
    pub host: String,
    pub port: u16,

    /// Sender identity, also used as the SMTP login
    pub sender: String,

    /// Sender credential
    pub password: SecretString,

    pub timeout: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables (and `.env` if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable source.
    ///
    /// Every missing required variable is reported in one error rather than
    /// failing on the first.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());

        let mut missing = Vec::new();
        let mut required = |name: &'static str| match get(name) {
            Some(value) => value,
            None => {
                missing.push(name);
                String::new()
            }
        };

        let region = required("AWS_REGION");
        let queue_name = required("SQSCONSUMER_QUEUENAME");
        let url_base_incidents = required("URL_BASE_INCIDENTS");
        let sender = required("GMAIL_USER");
        let password = required("GMAIL_PASSWORD");

        if !missing.is_empty() {
            return Err(ConfigError::Missing(missing));
        }

        Ok(Self {
            queue: QueueSettings {
                region,
                queue_name,
                wait_seconds: wait_seconds(&get)?,
                receive_error_backoff: Duration::from_millis(parse_or(
                    &get,
                    "RECEIVE_ERROR_BACKOFF_MS",
                    "u64",
                    1000,
                )?),
            },
            dispatch: DispatchSettings {
                url_base_incidents,
                http_timeout: Duration::from_secs(parse_or(&get, "HTTP_TIMEOUT_SECS", "u64", 30)?),
            },
            smtp: SmtpSettings {
                host: get("SMTP_HOST").unwrap_or_else(|| DEFAULT_SMTP_HOST.to_string()),
                port: parse_or(&get, "SMTP_PORT", "u16", DEFAULT_SMTP_PORT)?,
                sender,
                password: SecretString::from(password),
                timeout: Duration::from_secs(parse_or(&get, "SMTP_TIMEOUT_SECS", "u64", 30)?),
            },
        })
    }
}

fn wait_seconds<F>(get: &F) -> Result<i32, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    const NAME: &str = "RECEIVE_WAIT_SECONDS";
    const EXPECTED: &str = "number of seconds between 0 and 20";

    let seconds = parse_or(get, NAME, EXPECTED, 1)?;
    if !(0..=MAX_WAIT_SECONDS).contains(&seconds) {
        return Err(ConfigError::Invalid {
            name: NAME,
            expected: EXPECTED,
            value: seconds.to_string(),
        });
    }
    Ok(seconds)
}

fn parse_or<T, F>(
    get: &F,
    name: &'static str,
    expected: &'static str,
    default: T,
) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    F: Fn(&str) -> Option<String>,
{
    match get(name) {
        None => Ok(default),
        Some(value) => value.trim().parse().map_err(|_| ConfigError::Invalid {
            name,
            expected,
            value,
        }),
    }
}
