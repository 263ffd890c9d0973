use thiserror::Error;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("credential store error: {0}")]
    Store(String),

    #[error("content filter error: {0}")]
    Filter(String),

    #[error("invalid url: {0}")]
    InvalidUrl(String),

    #[error("engine error: {0}")]
    Engine(String),

    #[error("serialization error: {0}")]
    Serialization(String),

    #[error("internal error: {0}")]
    Internal(String),
}

pub type CoreResult<T> = Result<T, CoreError>;
