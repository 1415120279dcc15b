use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, patch, post},
    Json, Router,
};
use serde_json::json;

use super::domain::{FormPatch, FormValues};
use super::gateway::ApplicationGateway;
use super::machine::TransitionRefused;
use super::session::{error_map, IntakeSessionService, SessionError, SessionId, SessionView};

/// Router builder exposing the step-by-step intake endpoints.
pub fn intake_router<G>(service: Arc<IntakeSessionService<G>>) -> Router
where
    G: ApplicationGateway + 'static,
{
    Router::new()
        .route("/api/v1/intake/sessions", post(open_handler::<G>))
        .route(
            "/api/v1/intake/sessions/:session_id",
            get(view_handler::<G>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/fields",
            patch(edit_handler::<G>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/next",
            post(next_handler::<G>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/back",
            post(back_handler::<G>),
        )
        .route(
            "/api/v1/intake/sessions/:session_id/submit",
            post(submit_handler::<G>),
        )
        .route("/api/v1/intake/applications", post(submit_once_handler::<G>))
        .with_state(service)
}

pub(crate) async fn open_handler<G>(State(service): State<Arc<IntakeSessionService<G>>>) -> Response
where
    G: ApplicationGateway + 'static,
{
    match service.open() {
        Ok(view) => (StatusCode::CREATED, Json(view)).into_response(),
        Err(error) => error_response(error, None),
    }
}

pub(crate) async fn view_handler<G>(
    State(service): State<Arc<IntakeSessionService<G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: ApplicationGateway + 'static,
{
    let id = SessionId(session_id);
    respond(&service, &id, service.view(&id))
}

pub(crate) async fn edit_handler<G>(
    State(service): State<Arc<IntakeSessionService<G>>>,
    Path(session_id): Path<String>,
    Json(patch): Json<FormPatch>,
) -> Response
where
    G: ApplicationGateway + 'static,
{
    let id = SessionId(session_id);
    respond(&service, &id, service.edit(&id, patch))
}

pub(crate) async fn next_handler<G>(
    State(service): State<Arc<IntakeSessionService<G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: ApplicationGateway + 'static,
{
    let id = SessionId(session_id);
    respond(&service, &id, service.next(&id))
}

pub(crate) async fn back_handler<G>(
    State(service): State<Arc<IntakeSessionService<G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: ApplicationGateway + 'static,
{
    let id = SessionId(session_id);
    respond(&service, &id, service.back(&id))
}

pub(crate) async fn submit_handler<G>(
    State(service): State<Arc<IntakeSessionService<G>>>,
    Path(session_id): Path<String>,
) -> Response
where
    G: ApplicationGateway + 'static,
{
    let id = SessionId(session_id);
    let result = service.submit(&id).await;
    respond(&service, &id, result)
}

pub(crate) async fn submit_once_handler<G>(
    State(service): State<Arc<IntakeSessionService<G>>>,
    Json(values): Json<FormValues>,
) -> Response
where
    G: ApplicationGateway + 'static,
{
    match service.submit_once(&values).await {
        Ok(()) => (StatusCode::CREATED, Json(json!({ "status": "submitted" }))).into_response(),
        Err(error) => error_response(error, None),
    }
}

fn respond<G>(
    service: &IntakeSessionService<G>,
    id: &SessionId,
    result: Result<SessionView, SessionError>,
) -> Response
where
    G: ApplicationGateway + 'static,
{
    match result {
        Ok(view) => (StatusCode::OK, Json(view)).into_response(),
        Err(error) => error_response(error, service.peek(id)),
    }
}

fn error_response(error: SessionError, session: Option<SessionView>) -> Response {
    let status = match &error {
        SessionError::NotFound => StatusCode::NOT_FOUND,
        SessionError::AtCapacity => StatusCode::SERVICE_UNAVAILABLE,
        SessionError::Edit(_) | SessionError::Refused(TransitionRefused::Invalid(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        SessionError::Refused(_) => StatusCode::CONFLICT,
        SessionError::Insert(_) => StatusCode::BAD_GATEWAY,
    };

    let message = match &error {
        SessionError::Insert(insert) => insert.user_message(),
        other => other.to_string(),
    };

    let mut payload = json!({ "error": message });
    if let SessionError::Refused(TransitionRefused::Invalid(report)) = &error {
        payload["fields"] = json!(error_map(report));
    }
    if let Some(view) = session {
        payload["session"] = json!(view);
    }

    (status, Json(payload)).into_response()
}
