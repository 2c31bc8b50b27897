//! Ошибки приложения поверх `operator-error`.
//!
//! - `bootstrap`: запуск процесса (конфигурация, логирование, сокет).
//! - `request`: отказ HTTP-запроса до обращения к движку.

pub mod bootstrap;
pub mod request;

pub use bootstrap::{OperatorError, OperatorResult};
pub use operator_error::{ContextError, ErrorExt, RendezvousError, StatusCode};
pub use request::RequestError;
