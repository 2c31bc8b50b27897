use std::{any::Any, error::Error};

use crate::{LogLevel, StatusCode};

/// Расширение для ошибок брокера (object-safe).
///
/// Предоставляет вспомогательные методы для работы с ошибками:
/// - извлечение статус-кода,
/// - безопасное сообщение для клиента,
/// - детализированное сообщение для логов,
/// - формирование тегов для систем наблюдаемости (observability).
pub trait ErrorExt: Error + Send + Sync + 'static {
    /// Протокольный статус (для клиента или HTTP-уровня).
    ///
    /// По умолчанию возвращает [`StatusCode::Internal`].
    fn status_code(&self) -> StatusCode {
        StatusCode::Internal
    }

    /// Возвращает ошибку как [`Any`](std::any::Any),
    /// чтобы можно было выполнить downcast к конкретному типу.
    fn as_any(&self) -> &dyn Any;

    /// Безопасное сообщение для клиента.
    ///
    /// Для внутренних ошибок возвращает строку `"Internal server error"`.
    fn client_message(&self) -> String {
        match self.status_code() {
            StatusCode::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }

    /// Детализированное сообщение для логов.
    fn log_message(&self) -> String {
        format!("{self:?}")
    }

    /// Рекомендуемый уровень логирования, выводится из статус-кода.
    fn log_level(&self) -> LogLevel {
        self.status_code().log_level()
    }

    /// Набор тегов для систем наблюдаемости.
    fn metrics_tags(&self) -> Vec<(&'static str, String)> {
        vec![
            ("error_type", self.type_name()),
            ("status_code", self.status_code().to_string()),
        ]
    }

    /// Имя типа ошибки (для метрик или логирования).
    fn type_name(&self) -> String {
        std::any::type_name::<Self>()
            .split("::")
            .last()
            .unwrap_or("Unknown")
            .to_string()
    }
}
