use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::json;

use super::domain::{SessionError, SessionId};
use super::repository::{RepositoryError, SessionRepository};
use super::service::{StudyService, StudyServiceError};
use super::sink::ResultSink;
use super::wizard::WizardEvent;

pub const RESULTS_FILE_NAME: &str = "results.csv";

/// Optional body of the session creation request.
#[derive(Debug, Default, Deserialize)]
pub struct StartRequest {
    #[serde(default)]
    pub group: Option<String>,
}

/// Router builder exposing the participant wizard over HTTP.
pub fn study_router<R, S>(service: Arc<StudyService<R, S>>) -> Router
where
    R: SessionRepository + 'static,
    S: ResultSink + 'static,
{
    Router::new()
        .route("/api/v1/sessions", post(start_handler::<R, S>))
        .route("/api/v1/sessions/:session_id", get(view_handler::<R, S>))
        .route(
            "/api/v1/sessions/:session_id/events",
            post(event_handler::<R, S>),
        )
        .route(
            "/api/v1/sessions/:session_id/results.csv",
            get(results_handler::<R, S>),
        )
        .with_state(service)
}

pub(crate) async fn start_handler<R, S>(
    State(service): State<Arc<StudyService<R, S>>>,
    request: Option<Json<StartRequest>>,
) -> Response
where
    R: SessionRepository + 'static,
    S: ResultSink + 'static,
{
    let request = request.map(|Json(body)| body).unwrap_or_default();
    match service.start(request.group.as_deref()) {
        Ok(session) => {
            let summary = service.summary(&session);
            (StatusCode::CREATED, Json(summary)).into_response()
        }
        Err(err) => error_response(err),
    }
}

pub(crate) async fn view_handler<R, S>(
    State(service): State<Arc<StudyService<R, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    S: ResultSink + 'static,
{
    match service.view(&SessionId(session_id)).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn event_handler<R, S>(
    State(service): State<Arc<StudyService<R, S>>>,
    Path(session_id): Path<String>,
    Json(event): Json<WizardEvent>,
) -> Response
where
    R: SessionRepository + 'static,
    S: ResultSink + 'static,
{
    match service.apply(&SessionId(session_id), event).await {
        Ok(summary) => (StatusCode::OK, Json(summary)).into_response(),
        Err(err) => error_response(err),
    }
}

pub(crate) async fn results_handler<R, S>(
    State(service): State<Arc<StudyService<R, S>>>,
    Path(session_id): Path<String>,
) -> Response
where
    R: SessionRepository + 'static,
    S: ResultSink + 'static,
{
    match service.export_csv(&SessionId(session_id)) {
        Ok(bytes) => {
            let disposition = format!("attachment; filename=\"{RESULTS_FILE_NAME}\"");
            (
                StatusCode::OK,
                [
                    (header::CONTENT_TYPE, mime::TEXT_CSV_UTF_8.as_ref()),
                    (header::CONTENT_DISPOSITION, disposition.as_str()),
                ],
                bytes,
            )
                .into_response()
        }
        Err(err) => error_response(err),
    }
}

fn error_response(err: StudyServiceError) -> Response {
    let status = match &err {
        StudyServiceError::Session(SessionError::Auth) => StatusCode::UNAUTHORIZED,
        StudyServiceError::Session(SessionError::Validation(_)) => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        StudyServiceError::Session(SessionError::State(_))
        | StudyServiceError::Repository(RepositoryError::Conflict)
        | StudyServiceError::Repository(RepositoryError::Stale)
        | StudyServiceError::NotFinished(_) => StatusCode::CONFLICT,
        StudyServiceError::Repository(RepositoryError::NotFound) => StatusCode::NOT_FOUND,
        StudyServiceError::Session(SessionError::Demand(_))
        | StudyServiceError::Repository(RepositoryError::Unavailable(_))
        | StudyServiceError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    let payload = json!({
        "error": err.to_string(),
    });
    (status, Json(payload)).into_response()
}
