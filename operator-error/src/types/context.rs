use std::any::Any;

use thiserror::Error;

use crate::{ErrorExt, StatusCode};

/// Причина завершения контекста вызова.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Error)]
pub enum ContextError {
    /// Контекст отменён явно.
    #[error("context cancelled")]
    Cancelled,
    /// Истёк дедлайн контекста.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl ContextError {
    /// `true`, если контекст завершился по дедлайну.
    pub fn is_deadline(&self) -> bool {
        matches!(self, Self::DeadlineExceeded)
    }
}

impl ErrorExt for ContextError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Cancelled => StatusCode::Cancelled,
            Self::DeadlineExceeded => StatusCode::Timeout,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}
