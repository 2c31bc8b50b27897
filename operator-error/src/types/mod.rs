pub mod context;
pub mod rendezvous;

// Публичный экспорт всех типов ошибок из вложенных модулей, чтобы упростить
// доступ к ним из внешнего кода.
pub use context::*;
pub use rendezvous::*;
