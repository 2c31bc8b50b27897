use std::{any::Any, io};

use operator_error::{ErrorExt, StatusCode};
use thiserror::Error;

pub type OperatorResult<T> = Result<T, OperatorError>;

/// Ошибки запуска и остановки процесса.
#[derive(Debug, Error)]
pub enum OperatorError {
    /// Настройки загружены, но не проходят проверку.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// Ошибка источника настроек (файл, переменные окружения).
    #[error("Config source error: {0}")]
    ConfigSource(#[from] config::ConfigError),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

impl ErrorExt for OperatorError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidConfig(_) | Self::ConfigSource(_) => StatusCode::InvalidConfig,
            Self::Logging(_) => StatusCode::Internal,
            Self::Bind { .. } => StatusCode::BindFailed,
            Self::Io(_) => StatusCode::Io,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
