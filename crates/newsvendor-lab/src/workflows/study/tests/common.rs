use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use axum::response::Response;
use chrono::Utc;
use serde_json::Value;

use crate::workflows::study::domain::{Frame, FormAnswers, FormValue, SessionId};
use crate::workflows::study::export::SyncPayload;
use crate::workflows::study::repository::{RepositoryError, SessionRepository};
use crate::workflows::study::session::Session;
use crate::workflows::study::sink::{ResultSink, SyncError, SyncReceipt};
use crate::workflows::study::wizard::{transition, StudyContext, WizardEvent};
use crate::workflows::study::{study_router, DemandMode, FrameMode, StudyConfig, StudyService};

pub(super) const FIXED_DEMAND: [u32; 10] = [123, 67, 142, 89, 55, 110, 95, 134, 72, 101];

/// Profit per round when ordering 100 against `FIXED_DEMAND` at $10 / $3.
pub(super) const PROFIT_AT_100: [i64; 10] = [700, 370, 700, 590, 250, 700, 650, 700, 420, 700];

pub(super) fn study_config(frame_mode: FrameMode) -> StudyConfig {
    StudyConfig {
        demand_mode: DemandMode::Fixed(FIXED_DEMAND.to_vec()),
        frame_mode,
        ..StudyConfig::default()
    }
}

pub(super) fn context() -> StudyContext {
    StudyContext::from_config(study_config(FrameMode::Random))
}

pub(super) fn session(frame: Frame) -> Session {
    Session::new(SessionId("session-test".to_string()), frame, Utc::now())
}

pub(super) fn warmup_answers(q1: &str, q2: &str, q3: &str) -> FormAnswers {
    let mut answers = FormAnswers::new();
    answers.insert("q1_units_sold".to_string(), FormValue::from(q1));
    answers.insert("q2_leftover".to_string(), FormValue::from(q2));
    answers.insert("q3_unit_profit".to_string(), FormValue::from(q3));
    answers
}

pub(super) fn correct_warmup() -> FormAnswers {
    warmup_answers("80", "They are thrown away (Waste)", "$7")
}

pub(super) fn survey_answers() -> FormAnswers {
    let mut answers = FormAnswers::new();
    answers.insert(
        "Perception_Check".to_string(),
        FormValue::from("Minimizing overstock/waste"),
    );
    for (key, level) in [
        ("Env_CO2", 5),
        ("Env_Lifecycle", 4),
        ("Env_Certifications", 3),
        ("Env_HigherCost", 2),
        ("Env_ReduceWaste", 5),
    ] {
        answers.insert(key.to_string(), FormValue::Integer(level));
    }
    answers.insert("Industry".to_string(), FormValue::from("Logistics"));
    answers.insert("CompanySize".to_string(), FormValue::from("250-999"));
    answers.insert("Experience".to_string(), FormValue::from("4-6 years"));
    answers
}

pub(super) fn order(quantity: i64) -> WizardEvent {
    WizardEvent::SubmitOrder {
        order: FormValue::Integer(quantity),
    }
}

/// Events taking a fresh session up to the first ordering round.
pub(super) fn events_to_rounds() -> Vec<WizardEvent> {
    vec![
        WizardEvent::EnterCode {
            code: "START".to_string(),
        },
        WizardEvent::ConfirmIntro,
        WizardEvent::SubmitWarmup {
            answers: correct_warmup(),
        },
        WizardEvent::StartRounds,
    ]
}

/// Events for a whole run ordering `quantity` every round.
pub(super) fn full_run(quantity: i64, rounds: usize) -> Vec<WizardEvent> {
    let mut events = events_to_rounds();
    events.extend((0..rounds).map(|_| order(quantity)));
    events.push(WizardEvent::ConfirmRounds);
    events.push(WizardEvent::SubmitSurvey {
        answers: survey_answers(),
    });
    events
}

pub(super) fn drive(
    mut session: Session,
    events: Vec<WizardEvent>,
    context: &StudyContext,
) -> Session {
    for event in events {
        session = transition(&session, event, context).expect("scripted event accepted");
    }
    session
}

pub(super) fn build_service(
    frame_mode: FrameMode,
) -> (
    StudyService<MemoryRepository, RecordingSink>,
    Arc<MemoryRepository>,
    Arc<RecordingSink>,
) {
    let repository = Arc::new(MemoryRepository::default());
    let sink = Arc::new(RecordingSink::default());
    let service = StudyService::new(
        repository.clone(),
        sink.clone(),
        StudyContext::from_config(study_config(frame_mode)),
    );
    (service, repository, sink)
}

#[derive(Default, Clone)]
pub(super) struct MemoryRepository {
    pub(super) sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl SessionRepository for MemoryRepository {
    fn insert(&self, session: Session) -> Result<Session, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        if guard.contains_key(session.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id().clone(), session.clone());
        Ok(session)
    }

    fn update(&self, session: Session) -> Result<(), RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        let stored = guard.get(session.id()).ok_or(RepositoryError::NotFound)?;
        let next = session.supersede(stored)?;
        guard.insert(next.id().clone(), next);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let guard = self.sessions.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn claim_export(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        let mut guard = self.sessions.lock().expect("repository mutex poisoned");
        let session = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        Ok(session.claim_export())
    }
}

/// Holds the first `parties` fetches until all of them have read, so that
/// concurrent requests work from the same stored copy.
pub(super) struct OverlappingRepository {
    pub(super) inner: MemoryRepository,
    barrier: Barrier,
    parties: usize,
    fetches: AtomicUsize,
}

impl OverlappingRepository {
    pub(super) fn new(inner: MemoryRepository, parties: usize) -> Self {
        Self {
            inner,
            barrier: Barrier::new(parties),
            parties,
            fetches: AtomicUsize::new(0),
        }
    }
}

impl SessionRepository for OverlappingRepository {
    fn insert(&self, session: Session) -> Result<Session, RepositoryError> {
        self.inner.insert(session)
    }

    fn update(&self, session: Session) -> Result<(), RepositoryError> {
        self.inner.update(session)
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let fetched = self.inner.fetch(id);
        if self.fetches.fetch_add(1, Ordering::SeqCst) < self.parties {
            self.barrier.wait();
        }
        fetched
    }

    fn claim_export(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        self.inner.claim_export(id)
    }
}

pub(super) struct UnavailableRepository;

impl SessionRepository for UnavailableRepository {
    fn insert(&self, _session: Session) -> Result<Session, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn update(&self, _session: Session) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn fetch(&self, _id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }

    fn claim_export(&self, _id: &SessionId) -> Result<bool, RepositoryError> {
        Err(RepositoryError::Unavailable("store offline".to_string()))
    }
}

#[derive(Default, Clone)]
pub(super) struct RecordingSink {
    payloads: Arc<Mutex<Vec<SyncPayload>>>,
}

impl RecordingSink {
    pub(super) fn payloads(&self) -> Vec<SyncPayload> {
        self.payloads.lock().expect("sink mutex poisoned").clone()
    }
}

impl ResultSink for RecordingSink {
    async fn push(&self, payload: &SyncPayload) -> Result<SyncReceipt, SyncError> {
        self.payloads
            .lock()
            .expect("sink mutex poisoned")
            .push(payload.clone());
        Ok(SyncReceipt::Delivered { status: 200 })
    }
}

#[derive(Default, Clone)]
pub(super) struct FailingSink {
    attempts: Arc<Mutex<usize>>,
}

impl FailingSink {
    pub(super) fn attempts(&self) -> usize {
        *self.attempts.lock().expect("sink mutex poisoned")
    }
}

impl ResultSink for FailingSink {
    async fn push(&self, _payload: &SyncPayload) -> Result<SyncReceipt, SyncError> {
        *self.attempts.lock().expect("sink mutex poisoned") += 1;
        Err(SyncError::Status(503))
    }
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf8 body")
}

pub(super) fn router_with_service(
    service: StudyService<MemoryRepository, RecordingSink>,
) -> axum::Router {
    study_router(Arc::new(service))
}
