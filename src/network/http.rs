//! HTTP-фронтенд rendezvous-движка.
//!
//! # Routes
//!
//! - `GET|POST /pub`  публикация (поля `address`, `data`)
//! - `GET|POST /sub`  ожидание данных (поле `address`), ответ `text/plain`
//! - `GET  /`         баннер
//! - `HEAD /`         200 без тела
//! - `GET  /healthz`  готовность и счётчики движка
//!
//! Поля читаются из query-строки, для POST поверх неё накладывается
//! urlencoded-тело (значение из тела приоритетнее). Отсутствующие поля
//! считаются пустыми строками.

use std::{collections::HashMap, net::SocketAddr, time::Duration};

use axum::{
    async_trait,
    extract::{ConnectInfo, Form, FromRequest, FromRequestParts, Query, Request, State},
    http::{header, HeaderMap, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use operator_error::LogLevel;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use tracing::{debug, error, info, warn};

use crate::{
    config::Settings,
    error::{ErrorExt, RendezvousError, RequestError},
    rendezvous::{Context, RendezvousEngine},
};

/// Тело ответа `GET /`.
pub const BANNER: &str = "RTCTunnel Operator";

/// Общее состояние обработчиков.
#[derive(Debug, Clone)]
pub struct AppState {
    pub engine: RendezvousEngine,
    /// Максимальная длина поля `data` в байтах
    pub max_message_size: usize,
    /// Сколько запрос ждёт встречную сторону
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        engine: RendezvousEngine,
        settings: &Settings,
    ) -> Self {
        Self {
            engine,
            max_message_size: settings.max_message_size,
            request_timeout: settings.request_timeout(),
        }
    }
}

/// Поля запроса: query-строка плюс urlencoded-тело POST.
///
/// При повторе ключа берётся первое значение, тело проверяется раньше
/// query-строки.
#[derive(Debug, Default)]
struct FormFields(HashMap<String, String>);

impl FormFields {
    fn merge(
        &mut self,
        pairs: Vec<(String, String)>,
    ) {
        for (key, value) in pairs {
            self.0.entry(key).or_insert(value);
        }
    }

    /// Значение поля или пустая строка.
    fn value(
        &self,
        key: &str,
    ) -> String {
        self.0.get(key).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl<S> FromRequest<S> for FormFields
where
    S: Send + Sync,
{
    type Rejection = Response;

    async fn from_request(
        req: Request,
        state: &S,
    ) -> Result<Self, Self::Rejection> {
        let mut fields = FormFields::default();
        let (mut parts, body) = req.into_parts();
        let Query(query) = Query::<Vec<(String, String)>>::from_request_parts(&mut parts, state)
            .await
            .map_err(IntoResponse::into_response)?;

        if parts.method == Method::POST && is_urlencoded(&parts.headers) {
            let req = Request::from_parts(parts, body);
            let Form(body_pairs) = Form::<Vec<(String, String)>>::from_request(req, state)
                .await
                .map_err(IntoResponse::into_response)?;
            fields.merge(body_pairs);
        }
        fields.merge(query);
        Ok(fields)
    }
}

fn is_urlencoded(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/x-www-form-urlencoded"))
}

/// Собирает роутер со всеми маршрутами, CORS и трассировкой запросов.
pub fn app_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::PUT]);

    Router::new()
        .route("/", get(index_handler).head(head_handler))
        .route("/pub", get(pub_handler).post(pub_handler))
        .route("/sub", get(sub_handler).post(sub_handler))
        .route("/healthz", get(health_handler))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn index_handler() -> impl IntoResponse {
    ([(header::CONTENT_TYPE, "text/plain")], BANNER)
}

async fn head_handler() -> StatusCode {
    StatusCode::OK
}

/// GET|POST /pub: отдать `data` подписчику адреса `address`.
async fn pub_handler(
    State(state): State<AppState>,
    remote: Option<ConnectInfo<SocketAddr>>,
    fields: FormFields,
) -> Response {
    let remote_addr = remote_addr(&remote);
    let address = fields.value("address");
    let data = fields.value("data");

    if data.len() > state.max_message_size {
        let err = RequestError::DataTooLarge {
            size: data.len(),
            limit: state.max_message_size,
        };
        warn!(
            remote_addr = %remote_addr,
            address = %address,
            error = %err.log_message(),
            "data too large"
        );
        return error_response(&err);
    }

    info!(
        remote_addr = %remote_addr,
        address = %address,
        size = data.len(),
        "pub"
    );

    let ctx = Context::with_timeout(state.request_timeout);
    match state.engine.publish(&ctx, &address, data).await {
        Ok(()) => StatusCode::OK.into_response(),
        Err(err) => {
            log_failure("pub", &address, &err);
            error_response(&err)
        }
    }
}

/// GET|POST /sub: дождаться данных по адресу `address`.
async fn sub_handler(
    State(state): State<AppState>,
    remote: Option<ConnectInfo<SocketAddr>>,
    fields: FormFields,
) -> Response {
    let address = fields.value("address");
    info!(
        remote_addr = %remote_addr(&remote),
        address = %address,
        "sub"
    );

    let ctx = Context::with_timeout(state.request_timeout);
    match state.engine.subscribe(&ctx, &address).await {
        Ok(data) => ([(header::CONTENT_TYPE, "text/plain")], data).into_response(),
        Err(err) => {
            log_failure("sub", &address, &err);
            error_response(&err)
        }
    }
}

/// GET /healthz: готовность: 200 пока движок открыт, 503 после закрытия.
async fn health_handler(State(state): State<AppState>) -> Response {
    if state.engine.is_closed() {
        return (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(serde_json::json!({ "status": "closed" })),
        )
            .into_response();
    }

    Json(serde_json::json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "stats": state.engine.stats(),
    }))
    .into_response()
}

/// Ответ об ошибке: HTTP-статус из кода ошибки, тело: сообщение для
/// клиента.
fn error_response<E: ErrorExt>(err: &E) -> Response {
    let status = StatusCode::from_u16(err.status_code().http_status())
        .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.client_message()).into_response()
}

/// Уровень записи выводится из кода ошибки.
fn log_failure(
    route: &'static str,
    address: &str,
    err: &RendezvousError,
) {
    match err.log_level() {
        LogLevel::Trace | LogLevel::Debug => {
            debug!(route, address = %address, error = %err, "rendezvous failed")
        }
        LogLevel::Info => info!(route, address = %address, error = %err, "rendezvous failed"),
        LogLevel::Warn => warn!(route, address = %address, error = %err, "rendezvous failed"),
        LogLevel::Error => error!(route, address = %address, error = %err, "rendezvous failed"),
    }
}

fn remote_addr(remote: &Option<ConnectInfo<SocketAddr>>) -> String {
    remote
        .as_ref()
        .map(|ConnectInfo(addr)| addr.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}
