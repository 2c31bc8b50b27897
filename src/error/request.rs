use std::any::Any;

use operator_error::{ErrorExt, StatusCode};
use thiserror::Error;

/// Отказ в обработке HTTP-запроса до обращения к движку.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RequestError {
    /// Поле `data` длиннее допустимого.
    #[error("data too large")]
    DataTooLarge { size: usize, limit: usize },
}

impl ErrorExt for RequestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::DataTooLarge { .. } => StatusCode::SizeLimit,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn log_message(&self) -> String {
        match self {
            Self::DataTooLarge { size, limit } => {
                format!("data too large: {size} bytes, limit {limit}")
            }
        }
    }
}
