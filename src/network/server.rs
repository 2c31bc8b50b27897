use std::{future::Future, net::SocketAddr};

use tokio::net::TcpListener;
use tracing::info;

use super::http::{app_router, AppState};
use crate::error::{OperatorError, OperatorResult};

/// Открывает TCP-сокет для HTTP-сервера.
pub async fn bind(addr: &str) -> OperatorResult<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| OperatorError::Bind {
            addr: addr.to_string(),
            source,
        })
}

/// Обслуживает HTTP до сигнала `shutdown`.
///
/// По сигналу движок закрывается сразу: припаркованные `/pub` и `/sub`
/// получают 503 и не задерживают корректную остановку сервера.
pub async fn serve<F>(
    listener: TcpListener,
    state: AppState,
    shutdown: F,
) -> OperatorResult<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    info!(bind_addr = %local_addr, "starting server");

    let engine = state.engine.clone();
    let app = app_router(state);

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move {
        shutdown.await;
        info!("shutdown signal received");
        engine.close();
    })
    .await?;

    info!(bind_addr = %local_addr, "server stopped");
    Ok(())
}
