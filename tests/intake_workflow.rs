use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};
use creator_intake::config::{BackendConfig, SubmissionConfig};
use creator_intake::workflows::intake::{
    ApplicationGateway, ApplicationSchema, FormPatch, FormStep, FormValues, InsertError,
    NotificationVariant, RecordingSink, RestApplicationGateway, StepFormController, SubmitError,
};
use serde_json::{json, Value};

#[derive(Debug, Clone)]
struct CapturedInsert {
    api_key: Option<String>,
    authorization: Option<String>,
    prefer: Option<String>,
    body: Value,
}

#[derive(Clone)]
struct FakeBackend {
    captured: Arc<Mutex<Vec<CapturedInsert>>>,
    reply: Arc<dyn Fn() -> Response + Send + Sync>,
}

fn header(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
}

async fn insert_rows(
    State(backend): State<FakeBackend>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Response {
    backend
        .captured
        .lock()
        .expect("capture mutex poisoned")
        .push(CapturedInsert {
            api_key: header(&headers, "apikey"),
            authorization: header(&headers, "authorization"),
            prefer: header(&headers, "prefer"),
            body,
        });
    (backend.reply)()
}

async fn spawn_backend(
    reply: impl Fn() -> Response + Send + Sync + 'static,
) -> (SocketAddr, Arc<Mutex<Vec<CapturedInsert>>>) {
    let captured = Arc::new(Mutex::new(Vec::new()));
    let state = FakeBackend {
        captured: captured.clone(),
        reply: Arc::new(reply),
    };
    let app = Router::new()
        .route("/rest/v1/applications", post(insert_rows))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind fake backend");
    let addr = listener.local_addr().expect("local addr");
    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("fake backend serves");
    });
    (addr, captured)
}

fn backend_config(addr: SocketAddr) -> BackendConfig {
    BackendConfig {
        base_url: format!("http://{addr}"),
        api_key: "anon-key".to_string(),
        table: "applications".to_string(),
        request_timeout: Duration::from_secs(5),
    }
}

fn jane() -> FormValues {
    serde_json::from_value(json!({
        "hasOnlyFans": "yes",
        "onlyFansDuration": "1-2 years",
        "hasAgency": "no",
        "monthlyEarning": "$1000-5000",
        "instagramHandle": "@jane",
        "contentType": ["photos"],
        "helpNeeded": ["marketing"],
        "fullName": "Jane Doe",
        "email": "jane@example.com",
        "phoneNumber": "555-0100"
    }))
    .expect("values deserialize")
}

#[tokio::test]
async fn rest_gateway_posts_one_snake_case_row() {
    let (addr, captured) = spawn_backend(|| StatusCode::CREATED.into_response()).await;
    let gateway = RestApplicationGateway::new(&backend_config(addr)).expect("client builds");
    let application = ApplicationSchema.parse(&jane()).expect("jane is valid");

    gateway
        .insert(vec![application])
        .await
        .expect("insert accepted");

    let captured = captured.lock().expect("capture mutex poisoned").clone();
    assert_eq!(captured.len(), 1);
    let insert = &captured[0];
    assert_eq!(insert.api_key.as_deref(), Some("anon-key"));
    assert_eq!(insert.authorization.as_deref(), Some("Bearer anon-key"));
    assert_eq!(insert.prefer.as_deref(), Some("return=minimal"));

    let rows = insert.body.as_array().expect("payload is an array");
    assert_eq!(rows.len(), 1);
    assert_eq!(rows[0]["has_only_fans"], "yes");
    assert_eq!(rows[0]["instagram_handle"], "@jane");
    assert_eq!(rows[0]["additional_notes"], Value::Null);
    assert!(rows[0].get("fullName").is_none());
}

#[tokio::test]
async fn coded_backend_rejection_is_a_backend_error() {
    let (addr, _) = spawn_backend(|| {
        (
            StatusCode::CONFLICT,
            Json(json!({
                "code": "23505",
                "message": "duplicate key value violates unique constraint",
                "details": null
            })),
        )
            .into_response()
    })
    .await;
    let gateway = RestApplicationGateway::new(&backend_config(addr)).expect("client builds");
    let application = ApplicationSchema.parse(&jane()).expect("jane is valid");

    let err = gateway
        .insert(vec![application])
        .await
        .expect_err("backend rejects");

    assert_eq!(
        err,
        InsertError::Backend {
            code: "23505".to_string(),
            message: "duplicate key value violates unique constraint".to_string(),
        }
    );
}

#[tokio::test]
async fn html_error_page_is_not_shown_to_the_applicant() {
    let (addr, _) = spawn_backend(|| {
        (
            StatusCode::BAD_GATEWAY,
            "<html><body><h1>502 Bad Gateway</h1></body></html>",
        )
            .into_response()
    })
    .await;
    let gateway = RestApplicationGateway::new(&backend_config(addr)).expect("client builds");
    let application = ApplicationSchema.parse(&jane()).expect("jane is valid");

    let err = gateway
        .insert(vec![application])
        .await
        .expect_err("proxy rejects");

    let InsertError::Unknown(Some(message)) = &err else {
        panic!("unexpected classification: {err:?}");
    };
    assert_eq!(message, "request failed with status 502 Bad Gateway");
    assert!(!err.user_message().contains("<html"));
}

#[tokio::test]
async fn closed_port_is_a_connectivity_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let gateway = RestApplicationGateway::new(&backend_config(addr)).expect("client builds");
    let application = ApplicationSchema.parse(&jane()).expect("jane is valid");

    let err = gateway
        .insert(vec![application])
        .await
        .expect_err("nothing listening");

    assert!(matches!(err, InsertError::Connectivity { .. }), "{err:?}");
}

#[tokio::test]
async fn controller_submits_through_the_rest_gateway() {
    let (addr, captured) = spawn_backend(|| StatusCode::CREATED.into_response()).await;
    let gateway = Arc::new(RestApplicationGateway::new(&backend_config(addr)).expect("client builds"));
    let sink = Arc::new(RecordingSink::default());
    let settings = SubmissionConfig {
        success_route: "/thanks".to_string(),
        redirect_delay: Duration::from_millis(10),
    };
    let mut controller = StepFormController::new(gateway, sink.clone(), sink.clone(), settings);

    let values = jane();
    for step in FormStep::ordered() {
        controller
            .edit(FormPatch::for_step(&values, step))
            .expect("step fields editable");
        if !step.is_last() {
            controller.next().expect("step valid");
        }
    }

    let receipt = controller.submit().await.expect("submitted");
    receipt.redirect.await.expect("redirect completes");

    assert_eq!(captured.lock().expect("capture mutex poisoned").len(), 1);
    assert_eq!(sink.routes(), ["/thanks"]);
    assert_eq!(controller.current_step(), Some(FormStep::Background));
}

#[tokio::test]
async fn controller_reports_unreachable_backend() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("bind free port");
    let addr = listener.local_addr().expect("local addr");
    drop(listener);

    let gateway = Arc::new(RestApplicationGateway::new(&backend_config(addr)).expect("client builds"));
    let sink = Arc::new(RecordingSink::default());
    let mut controller =
        StepFormController::new(gateway, sink.clone(), sink.clone(), SubmissionConfig::default());

    let values = jane();
    for step in FormStep::ordered() {
        controller
            .edit(FormPatch::for_step(&values, step))
            .expect("step fields editable");
        if !step.is_last() {
            controller.next().expect("step valid");
        }
    }

    let err = controller.submit().await.expect_err("backend unreachable");
    assert!(matches!(
        err,
        SubmitError::Insert(InsertError::Connectivity { .. })
    ));

    let notification = sink.notifications().pop().expect("error notification");
    assert_eq!(notification.variant, NotificationVariant::Destructive);
    assert_eq!(
        notification.description,
        "Unable to reach the server. Please check your internet connection and try again."
    );
    assert_eq!(controller.values(), &values);
    assert_eq!(controller.current_step(), Some(FormStep::Contact));
}
