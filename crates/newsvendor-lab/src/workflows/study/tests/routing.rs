use super::common::*;
use axum::body::Body;
use axum::extract::{Path, State};
use axum::http::{header, Request, StatusCode};
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use crate::workflows::study::router::{event_handler, start_handler, view_handler};
use crate::workflows::study::service::StudyService;
use crate::workflows::study::wizard::{StudyContext, WizardEvent};
use crate::workflows::study::FrameMode;

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(serde_json::to_vec(&body).expect("json body")))
        .expect("request builds")
}

fn get(uri: &str) -> Request<Body> {
    Request::get(uri).body(Body::empty()).expect("request builds")
}

#[tokio::test]
async fn create_route_returns_lobby_screen() {
    let (service, _, _) = build_service(FrameMode::Random);
    let router = router_with_service(service);

    let response = router
        .oneshot(post_json("/api/v1/sessions", json!({})))
        .await
        .expect("route executes");

    assert_eq!(response.status(), StatusCode::CREATED);
    let payload = read_json_body(response).await;
    assert_eq!(payload["stage"], "lobby");
    assert_eq!(payload["screen"]["title"], "Welcome");
    assert_eq!(payload["screen"]["fields"][0]["kind"]["kind"], "secret");
    assert!(payload["session_id"]
        .as_str()
        .unwrap_or_default()
        .starts_with("session-"));
}

#[tokio::test]
async fn create_route_accepts_an_empty_body() {
    let (service, _, _) = build_service(FrameMode::Random);
    let response = router_with_service(service)
        .oneshot(
            Request::post("/api/v1/sessions")
                .body(Body::empty())
                .expect("request builds"),
        )
        .await
        .expect("route executes");
    assert_eq!(response.status(), StatusCode::CREATED);
}

#[tokio::test]
async fn group_mode_rejects_bad_group_with_unprocessable() {
    let (service, _, _) = build_service(FrameMode::Group);
    let service = Arc::new(service);

    let response = start_handler::<MemoryRepository, RecordingSink>(
        State(service.clone()),
        Some(axum::Json(crate::workflows::study::StartRequest {
            group: Some("7".to_string()),
        })),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let response = start_handler::<MemoryRepository, RecordingSink>(State(service), None).await;
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn wrong_code_is_unauthorized_and_wrong_screen_is_conflict() {
    let (service, _, _) = build_service(FrameMode::Random);
    let service = Arc::new(service);
    let id = service.start(None).expect("session starts").id().0.clone();

    let response = event_handler::<MemoryRepository, RecordingSink>(
        State(service.clone()),
        Path(id.clone()),
        axum::Json(WizardEvent::EnterCode {
            code: "letmein".to_string(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let payload = read_json_body(response).await;
    assert!(payload["error"]
        .as_str()
        .unwrap_or_default()
        .contains("access code"));

    let response = event_handler::<MemoryRepository, RecordingSink>(
        State(service),
        Path(id),
        axum::Json(WizardEvent::SubmitSurvey {
            answers: survey_answers(),
        }),
    )
    .await;
    assert_eq!(response.status(), StatusCode::CONFLICT);
}

#[tokio::test]
async fn unknown_session_is_not_found() {
    let (service, _, _) = build_service(FrameMode::Random);
    let response = view_handler::<MemoryRepository, RecordingSink>(
        State(Arc::new(service)),
        Path("session-999999".to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn repository_outage_is_internal_error() {
    let service = Arc::new(StudyService::new(
        Arc::new(UnavailableRepository),
        Arc::new(RecordingSink::default()),
        StudyContext::from_config(study_config(FrameMode::Random)),
    ));
    let response = view_handler::<UnavailableRepository, RecordingSink>(
        State(service),
        Path("session-000001".to_string()),
    )
    .await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

#[tokio::test]
async fn full_run_over_http_ends_with_csv_download() {
    let (service, _, sink) = build_service(FrameMode::Random);
    let service = Arc::new(service);
    let id = service.start(None).expect("session starts").id().0.clone();
    let router = crate::workflows::study::study_router(service);
    let events_uri = format!("/api/v1/sessions/{id}/events");
    let results_uri = format!("/api/v1/sessions/{id}/results.csv");

    let early = router
        .clone()
        .oneshot(get(&results_uri))
        .await
        .expect("route executes");
    assert_eq!(early.status(), StatusCode::CONFLICT);

    let mut last = Value::Null;
    for event in full_run(100, 10) {
        let body = serde_json::to_value(&event).expect("event serializes");
        let response = router
            .clone()
            .oneshot(post_json(&events_uri, body))
            .await
            .expect("route executes");
        assert_eq!(response.status(), StatusCode::OK);
        last = read_json_body(response).await;
    }
    assert_eq!(last["stage"], "done");
    assert_eq!(last["export_sent"], true);
    assert_eq!(last["sync_status"]["state"], "delivered");

    let view = router
        .clone()
        .oneshot(get(&format!("/api/v1/sessions/{id}")))
        .await
        .expect("route executes");
    assert_eq!(view.status(), StatusCode::OK);

    let download = router
        .oneshot(get(&results_uri))
        .await
        .expect("route executes");
    assert_eq!(download.status(), StatusCode::OK);
    assert_eq!(
        download.headers()[header::CONTENT_TYPE],
        "text/csv; charset=utf-8"
    );
    let text = read_text_body(download).await;
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 11);
    let first_round: Vec<&str> = lines[1].split(',').collect();
    assert_eq!(first_round[0], "1");
    assert_eq!(&first_round[2..6], &["100", "123", "700", "3"]);
    assert_eq!(sink.payloads().len(), 1);
}
