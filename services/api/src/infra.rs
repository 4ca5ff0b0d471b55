use metrics_exporter_prometheus::PrometheusHandle;
use newsvendor_lab::config::{parse_sequence, AppConfig};
use newsvendor_lab::error::AppError;
use newsvendor_lab::workflows::study::{
    HttpResultSink, RepositoryError, Session, SessionId, SessionRepository, StudyContext,
    StudyService,
};
use std::collections::HashMap;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex, MutexGuard};

pub(crate) type LiveStudyService = StudyService<InMemorySessionRepository, HttpResultSink>;

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Process-local session store. Sessions live until the process exits.
#[derive(Default, Clone)]
pub(crate) struct InMemorySessionRepository {
    sessions: Arc<Mutex<HashMap<SessionId, Session>>>,
}

impl InMemorySessionRepository {
    fn lock(&self) -> Result<MutexGuard<'_, HashMap<SessionId, Session>>, RepositoryError> {
        self.sessions
            .lock()
            .map_err(|_| RepositoryError::Unavailable("session store poisoned".to_string()))
    }
}

impl SessionRepository for InMemorySessionRepository {
    fn insert(&self, session: Session) -> Result<Session, RepositoryError> {
        let mut guard = self.lock()?;
        if guard.contains_key(session.id()) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(session.id().clone(), session.clone());
        Ok(session)
    }

    fn update(&self, session: Session) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        let stored = guard.get(session.id()).ok_or(RepositoryError::NotFound)?;
        let next = session.supersede(stored)?;
        guard.insert(next.id().clone(), next);
        Ok(())
    }

    fn fetch(&self, id: &SessionId) -> Result<Option<Session>, RepositoryError> {
        let guard = self.lock()?;
        Ok(guard.get(id).cloned())
    }

    fn claim_export(&self, id: &SessionId) -> Result<bool, RepositoryError> {
        let mut guard = self.lock()?;
        let session = guard.get_mut(id).ok_or(RepositoryError::NotFound)?;
        Ok(session.claim_export())
    }
}

/// Wires the configured study, the in-memory store and the HTTP sink.
pub(crate) fn build_service(config: &AppConfig) -> Result<LiveStudyService, AppError> {
    let repository = Arc::new(InMemorySessionRepository::default());
    let sink = Arc::new(HttpResultSink::new(
        config.sync.endpoint.clone(),
        config.sync.timeout,
    )?);
    let context = StudyContext::from_config(config.study.clone());
    Ok(StudyService::new(repository, sink, context))
}

/// Orders typed on the command line, e.g. `100,90,120`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct OrderScript(pub(crate) Vec<u32>);

pub(crate) fn parse_orders(raw: &str) -> Result<OrderScript, String> {
    parse_sequence(raw)
        .map(OrderScript)
        .map_err(|_| format!("'{raw}' is not a comma-separated list of whole numbers"))
}
