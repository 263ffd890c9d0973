use thiserror::Error;

/// Error type for the ostiary session layer, aggregating errors from the
/// dependency crates.
///
/// These surface only at session setup (configuration, client
/// construction). Once a session runs, failures degrade to the engine's
/// native behavior instead of propagating; see the challenge and
/// interception modules.
#[derive(Debug, Error)]
pub enum OstiaryError {
    #[error("core error: {0}")]
    Core(#[from] ostiary_core::CoreError),

    #[error("interception error: {0}")]
    Intercept(#[from] ostiary_intercept::InterceptError),

    #[error("configuration error: {0}")]
    Config(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<toml::de::Error> for OstiaryError {
    fn from(e: toml::de::Error) -> Self {
        OstiaryError::Config(format!("TOML parse error: {}", e))
    }
}

pub type OstiaryResult<T> = Result<T, OstiaryError>;
