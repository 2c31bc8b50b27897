use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    response::Response,
    Router,
};
use operator::{
    network::{app_router, AppState},
    RendezvousEngine,
};
use rstest::rstest;
use tower::ServiceExt;

fn app(timeout: Duration) -> (Router, RendezvousEngine) {
    let engine = RendezvousEngine::with_defaults();
    let state = AppState {
        engine: engine.clone(),
        max_message_size: 128 * 1024,
        request_timeout: timeout,
    };
    (app_router(state), engine)
}

async fn body_string(resp: Response) -> String {
    let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

async fn wait_for_subscriber(
    engine: &RendezvousEngine,
    address: &str,
) {
    while engine.pending(address).await.unwrap().subscribes == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

/// Тест проверяет обмен через GET: /sub ждёт, /pub отдаёт данные.
#[tokio::test]
async fn test_get_round_trip() {
    let (app, engine) = app(Duration::from_secs(5));

    let sub = tokio::spawn(
        app.clone()
            .oneshot(Request::get("/sub?address=test").body(Body::empty()).unwrap()),
    );
    wait_for_subscriber(&engine, "test").await;

    let resp = app
        .oneshot(
            Request::get("/pub?address=test&data=Hello%20World")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = sub.await.unwrap().unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.headers()[header::CONTENT_TYPE], "text/plain");
    assert_eq!(body_string(resp).await, "Hello World");
}

/// Тест проверяет обмен через POST с urlencoded-телом.
#[tokio::test]
async fn test_post_round_trip() {
    let (app, engine) = app(Duration::from_secs(5));

    let sub = tokio::spawn(
        app.clone().oneshot(
            Request::post("/sub")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("address=test"))
                .unwrap(),
        ),
    );
    wait_for_subscriber(&engine, "test").await;

    let resp = app
        .oneshot(
            Request::post("/pub")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from("address=test&data=Hello+World"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = sub.await.unwrap().unwrap();
    assert_eq!(body_string(resp).await, "Hello World");
}

/// Тест проверяет POST с полями только в query-строке и пустым телом.
#[tokio::test]
async fn test_post_fields_in_query() {
    let (app, engine) = app(Duration::from_secs(5));

    let sub = tokio::spawn(
        app.clone()
            .oneshot(Request::post("/sub?address=room").body(Body::empty()).unwrap()),
    );
    wait_for_subscriber(&engine, "room").await;

    let resp = app
        .oneshot(
            Request::post("/pub?address=room&data=offer")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = sub.await.unwrap().unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "offer");
}

/// Тест проверяет, что POST /sub без тела по истечении таймаута даёт 504,
/// а не ошибку разбора формы.
#[tokio::test]
async fn test_post_query_only_times_out() {
    let (app, _engine) = app(Duration::from_millis(20));

    let resp = app
        .oneshot(Request::post("/sub?address=room").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
}

/// Тест проверяет, что отсутствующие поля считаются пустыми строками:
/// пустой адрес тоже адрес.
#[tokio::test]
async fn test_missing_fields_are_empty() {
    let (app, engine) = app(Duration::from_secs(5));

    let sub = tokio::spawn(
        app.clone()
            .oneshot(Request::get("/sub").body(Body::empty()).unwrap()),
    );
    wait_for_subscriber(&engine, "").await;

    let resp = app
        .oneshot(Request::get("/pub").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = sub.await.unwrap().unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(body_string(resp).await, "");
}

#[tokio::test]
async fn test_data_too_large() {
    let (app, _engine) = app(Duration::from_secs(5));
    let data = "x".repeat(128 * 1024 + 1);

    let resp = app
        .oneshot(
            Request::post("/pub")
                .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(Body::from(format!("address=test&data={data}")))
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(resp).await, "data too large");
}

/// Тест проверяет, что без встречной стороны запрос завершается 504.
#[rstest]
#[case::publish("/pub?address=nobody&data=x")]
#[case::subscribe("/sub?address=nobody")]
#[tokio::test]
async fn test_timeout_is_gateway_timeout(#[case] uri: &str) {
    let (app, engine) = app(Duration::from_millis(20));

    let resp = app
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::GATEWAY_TIMEOUT);
    assert!(engine.pending("nobody").await.unwrap().is_empty());
}

#[tokio::test]
async fn test_head_root() {
    let (app, _engine) = app(Duration::from_secs(1));
    let resp = app
        .oneshot(
            Request::builder()
                .method(Method::HEAD)
                .uri("/")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    assert!(body_string(resp).await.is_empty());
}

/// Тест проверяет CORS preflight: любой источник, методы GET/POST/PUT.
#[rstest]
#[case::post("POST")]
#[case::put("PUT")]
#[tokio::test]
async fn test_cors_preflight(#[case] requested: &str) {
    let (app, _engine) = app(Duration::from_secs(1));
    let resp = app
        .oneshot(
            Request::builder()
                .method(Method::OPTIONS)
                .uri("/pub")
                .header(header::ORIGIN, "https://peer.example")
                .header(header::ACCESS_CONTROL_REQUEST_METHOD, requested)
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(resp.status(), StatusCode::OK);
    let headers = resp.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    let methods = headers[header::ACCESS_CONTROL_ALLOW_METHODS]
        .to_str()
        .unwrap();
    assert!(methods.contains(requested), "{methods} lacks {requested}");
    for method in ["GET", "POST", "PUT"] {
        assert!(methods.contains(method), "{methods} lacks {method}");
    }
}

/// Тест проверяет health-эндпоинт до и после закрытия движка.
#[tokio::test]
async fn test_healthz() {
    let (app, engine) = app(Duration::from_secs(1));

    let resp = app
        .clone()
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json["status"], "ok");
    assert_eq!(json["stats"]["publishes"], 0);

    engine.close();
    let resp = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = serde_json::from_str(&body_string(resp).await).unwrap();
    assert_eq!(json["status"], "closed");
}

/// Тест проверяет, что закрытие движка освобождает припаркованный /sub
/// с 503.
#[tokio::test]
async fn test_close_releases_parked_request() {
    let (app, engine) = app(Duration::from_secs(30));

    let sub = tokio::spawn(
        app.oneshot(Request::get("/sub?address=room").body(Body::empty()).unwrap()),
    );
    wait_for_subscriber(&engine, "room").await;
    engine.close();

    let resp = sub.await.unwrap().unwrap();
    assert_eq!(resp.status(), StatusCode::SERVICE_UNAVAILABLE);
}
