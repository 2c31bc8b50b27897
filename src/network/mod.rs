//! Сетевой модуль: HTTP-фронтенд движка и запуск сервера.
//!
//! ## Подмодули
//!
//! - `http`: маршруты `/pub`, `/sub`, `/`, `/healthz` поверх axum.
//! - `server`: привязка сокета и обслуживание с корректной остановкой.

pub mod http;
pub mod server;

pub use http::{app_router, AppState, BANNER};
pub use server::{bind, serve};
