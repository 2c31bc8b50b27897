use std::any::Any;

use thiserror::Error;

use crate::{ContextError, ErrorExt, StatusCode};

/// Ошибки операций `publish` / `subscribe`.
///
/// Частичного успеха не бывает: вызов либо полностью завершён (значение
/// передано ровно одному получателю), либо вернул одну из этих ошибок.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum RendezvousError {
    /// Контекст вызывающей стороны отменён до сопоставления.
    #[error("rendezvous cancelled")]
    Cancelled,
    /// Дедлайн истёк до сопоставления.
    #[error("rendezvous timed out")]
    TimedOut,
    /// Движок остановлен до или во время вызова.
    #[error("rendezvous engine is closed")]
    Closed,
}

impl RendezvousError {
    /// Ошибка вызвана завершением контекста (отмена или дедлайн).
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::Cancelled | Self::TimedOut)
    }

    /// Ошибка вызвана истечением дедлайна.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::TimedOut)
    }

    pub fn is_closed(&self) -> bool {
        matches!(self, Self::Closed)
    }
}

impl From<ContextError> for RendezvousError {
    fn from(err: ContextError) -> Self {
        match err {
            ContextError::Cancelled => Self::Cancelled,
            ContextError::DeadlineExceeded => Self::TimedOut,
        }
    }
}

impl ErrorExt for RendezvousError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::Cancelled => StatusCode::Cancelled,
            Self::TimedOut => StatusCode::Timeout,
            Self::Closed => StatusCode::EngineClosed,
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        let outcome = match self {
            Self::Cancelled => "cancelled",
            Self::TimedOut => "timed_out",
            Self::Closed => "closed",
        };
        vec![
            ("error_type", "rendezvous".to_string()),
            ("status_code", self.status_code().to_string()),
            ("outcome", outcome.to_string()),
        ]
    }
}
