use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("AUTHENTICATION_FAILED: {0}")]
    Authentication(String),
    #[error("NOT_AUTHORIZED: {0}")]
    Authorization(String),
    #[error("STORAGE_FAILURE: {0}")]
    Storage(String),
    #[error("VALIDATION_FAILED: {0}")]
    Validation(String),
    #[error("CONFIG_INVALID: {0}")]
    Config(String),
    #[error("IO_FAILURE: {0}")]
    Io(String),
    #[error("INTERNAL: {0}")]
    Internal(String),
}

impl AppError {
    /// The message without its code prefix, for re-wrapping under another kind.
    pub fn into_message(self) -> String {
        match self {
            Self::Authentication(message)
            | Self::Authorization(message)
            | Self::Storage(message)
            | Self::Validation(message)
            | Self::Config(message)
            | Self::Io(message)
            | Self::Internal(message) => message,
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value.to_string())
    }
}

impl From<rusqlite::Error> for AppError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Storage(value.to_string())
    }
}

impl From<serde_yaml::Error> for AppError {
    fn from(value: serde_yaml::Error) -> Self {
        Self::Config(value.to_string())
    }
}

pub type AppResult<T> = Result<T, AppError>;
