use thiserror::Error;

/// Startup configuration failures. Always fatal: the consumer never enters
/// its loop with an incomplete configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Required environment variables are missing: {}", .0.join(", "))]
    Missing(Vec<&'static str>),

    #[error("{name} must be a valid {expected}, got {value:?}")]
    Invalid {
        name: &'static str,
        expected: &'static str,
        value: String,
    },
}
