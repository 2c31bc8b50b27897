use std::fmt;

use num_enum::TryFromPrimitive;
#[cfg(feature = "serde_repr")]
use serde_repr::{Deserialize_repr, Serialize_repr};
#[cfg(feature = "strum")]
use strum_macros::{AsRefStr, EnumIter};

/// Коды статуса для категоризации ошибок.
///
/// # Диапазоны:
/// - 0xxx: Успех
/// - 1xxx: Общие ошибки
/// - 6xxx: Сеть / IO
/// - 8xxx: Протокольные ошибки (HTTP-фронтенд)
/// - 9xxx: Rendezvous (ожидание, отмена, закрытие движка)
///
/// # Реализация:
/// - `num_enum::TryFromPrimitive` даёт нативную реализацию `TryFrom<u32>`.
/// - опционально: `strum` для `AsRefStr`/`EnumIter` (feature = "strum").
/// - опционально: `serde_repr` для сериализации в виде числового значения
///   (feature = "serde_repr").
#[cfg_attr(feature = "strum", derive(AsRefStr, EnumIter))]
#[cfg_attr(feature = "serde_repr", derive(Serialize_repr, Deserialize_repr))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, TryFromPrimitive)]
#[repr(u32)]
#[non_exhaustive]
pub enum StatusCode {
    // === 0xxx: Успех ===
    Success = 0,

    // === 1xxx: Общие ошибки ===
    Internal = 1003,
    InvalidConfig = 1006,

    // === 6xxx: Сеть/IO ===
    Io = 6000,
    Timeout = 6002,
    BindFailed = 6008,

    // === 8xxx: Протокол ===
    SizeLimit = 8007,

    // === 9xxx: Rendezvous ===
    Cancelled = 9000,
    EngineClosed = 9001,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

////////////////////////////////////////////////////////////////////////////////
// Собственные методы
////////////////////////////////////////////////////////////////////////////////

impl StatusCode {
    /// Числовое представление кода статуса.
    pub const fn code(self) -> u32 {
        self as u32
    }

    /// Пытается получить вариант `StatusCode` из `u32`.
    ///
    /// Возвращает `None`, если значение не соответствует ни одному варианту.
    pub fn from_u32(v: u32) -> Option<Self> {
        Self::try_from(v).ok()
    }

    /// Возвращает `true`, если операцию с этим кодом имеет смысл повторить.
    ///
    /// Ядро само повторов не делает: решение остаётся за вызывающей
    /// стороной (например, пир повторяет `/sub` после 504).
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout | Self::Cancelled)
    }

    /// Вернёт `true`, если переданный `code` означает успешный результат.
    pub fn is_success(code: u32) -> bool {
        Self::Success as u32 == code
    }

    /// Является ли код ошибкой со стороны клиента: проблема в запросе.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::SizeLimit | Self::Cancelled)
    }

    /// Является ли код ошибкой сервера: внутренняя или инфраструктурная
    /// ошибка.
    pub fn is_server_error(&self) -> bool {
        let c = self.code();
        matches!(c, 1000..=1999 | 6000..=6999) || matches!(self, Self::EngineClosed)
    }

    /// Относится ли код к подсистеме rendezvous (диапазон 9xxx).
    pub fn is_rendezvous_error(&self) -> bool {
        (9000..=9999).contains(&self.code())
    }

    /// Рекомендуемый уровень логирования для данного кода.
    ///
    /// Истечение таймаута для сигналинга: штатная ситуация (второй пир
    /// просто не пришёл), поэтому `Timeout` и `Cancelled` не выше `Info`.
    pub fn log_level(&self) -> LogLevel {
        match self {
            Self::Success => LogLevel::Trace,
            Self::Cancelled => LogLevel::Debug,
            Self::Timeout | Self::SizeLimit => LogLevel::Info,
            Self::EngineClosed | Self::Io => LogLevel::Warn,
            Self::Internal | Self::InvalidConfig | Self::BindFailed => LogLevel::Error,
        }
    }

    /// HTTP-статус, соответствующий коду статуса.
    ///
    /// Используется HTTP-фронтендом: истечение ожидания и отмена отдаются как
    /// 504 (Gateway Timeout), закрытый движок как 503.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Success => 200,
            Self::SizeLimit => 400,
            Self::Timeout | Self::Cancelled => 504,
            Self::EngineClosed => 503,
            _ => 500,
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Общие реализации трейтов для StatusCode
////////////////////////////////////////////////////////////////////////////////

impl From<StatusCode> for u32 {
    fn from(c: StatusCode) -> Self {
        c.code()
    }
}

impl fmt::Display for StatusCode {
    fn fmt(
        &self,
        f: &mut fmt::Formatter<'_>,
    ) -> fmt::Result {
        #[cfg(feature = "strum")]
        {
            write!(f, "{} ({})", self.as_ref(), self.code())
        }
        #[cfg(not(feature = "strum"))]
        {
            write!(f, "{:?} ({})", self, self.code())
        }
    }
}

////////////////////////////////////////////////////////////////////////////////
// Тесты
////////////////////////////////////////////////////////////////////////////////

#[cfg(test)]
mod tests {
    use super::*;

    /// Тест проверяет, что retryable-коды помечаются корректно.
    #[test]
    fn test_retryable() {
        assert!(StatusCode::Timeout.is_retryable());
        assert!(StatusCode::Cancelled.is_retryable());
        assert!(!StatusCode::EngineClosed.is_retryable());
        assert!(!StatusCode::SizeLimit.is_retryable());
    }

    /// Тест проверяет разделение клиентских и серверных ошибок.
    #[test]
    fn test_client_vs_server() {
        assert!(StatusCode::SizeLimit.is_client_error());
        assert!(StatusCode::Cancelled.is_client_error());
        assert!(StatusCode::Internal.is_server_error());
        assert!(StatusCode::EngineClosed.is_server_error());
        assert!(!StatusCode::SizeLimit.is_server_error());
    }

    /// Тест проверяет соответствие кодов HTTP-статусам.
    #[test]
    fn test_http_mapping() {
        assert_eq!(StatusCode::Success.http_status(), 200);
        assert_eq!(StatusCode::SizeLimit.http_status(), 400);
        assert_eq!(StatusCode::Timeout.http_status(), 504);
        assert_eq!(StatusCode::Cancelled.http_status(), 504);
        assert_eq!(StatusCode::EngineClosed.http_status(), 503);
        assert_eq!(StatusCode::Internal.http_status(), 500);
    }

    /// Тест проверяет конвертацию через `TryFrom<u32>` и вспомогательную
    /// `from_u32`.
    #[test]
    fn test_from_try_from_u32() {
        let n = StatusCode::EngineClosed.code();
        assert_eq!(StatusCode::try_from(n).unwrap(), StatusCode::EngineClosed);
        assert!(StatusCode::from_u32(99999).is_none());
    }

    #[test]
    fn test_code_and_into() {
        let c = StatusCode::Cancelled;
        assert_eq!(c.code(), 9000);
        let n: u32 = c.into();
        assert_eq!(n, 9000);
        assert!(StatusCode::is_success(StatusCode::Success.code()));
        assert!(!StatusCode::is_success(StatusCode::Timeout.code()));
    }

    #[test]
    fn test_is_rendezvous_error() {
        assert!(StatusCode::Cancelled.is_rendezvous_error());
        assert!(StatusCode::EngineClosed.is_rendezvous_error());
        assert!(!StatusCode::Timeout.is_rendezvous_error());
    }

    /// Тест проверяет отображаемый уровень логирования для разных кодов.
    #[test]
    fn test_log_level_mappings() {
        assert_eq!(StatusCode::Success.log_level(), LogLevel::Trace);
        assert_eq!(StatusCode::Cancelled.log_level(), LogLevel::Debug);
        assert_eq!(StatusCode::Timeout.log_level(), LogLevel::Info);
        assert_eq!(StatusCode::BindFailed.log_level(), LogLevel::Error);
    }

    /// Тест проверяет формат `Display`: строка должна содержать имя варианта и
    /// числовой код.
    #[test]
    fn test_display_contains_name_and_code() {
        let s = format!("{}", StatusCode::EngineClosed);
        assert!(s.contains("9001"), "Display must contain code 9001, got: {s}");
        assert!(
            s.contains("EngineClosed"),
            "Display must contain variant name 'EngineClosed', got: {s}"
        );
    }

    /// Тест проверяет фоллбек http_status для варианта без явного маппинга.
    #[test]
    fn test_http_default_fallback() {
        assert_eq!(StatusCode::Io.http_status(), 500);
        assert_eq!(StatusCode::BindFailed.http_status(), 500);
    }
}
