use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, error, info, warn};

use super::config::FrameMode;
use super::domain::{Frame, SessionError, SessionId, SyncStatus, WizardStage};
use super::export::{self, ExportError, SyncPayload};
use super::repository::{RepositoryError, SessionRepository};
use super::session::Session;
use super::sink::{ResultSink, SyncReceipt};
use super::view::{render, ScreenView};
use super::wizard::{transition, StudyContext, WizardEvent};

/// Service composing the wizard, the session store and the result sink.
pub struct StudyService<R, S> {
    repository: Arc<R>,
    sink: Arc<S>,
    context: Arc<StudyContext>,
}

static SESSION_SEQUENCE: AtomicU64 = AtomicU64::new(1);

fn next_session_id() -> SessionId {
    let id = SESSION_SEQUENCE.fetch_add(1, Ordering::Relaxed);
    SessionId(format!("session-{id:06}"))
}

/// Progress plus the screen to show, as returned to clients.
#[derive(Debug, Clone, Serialize)]
pub struct SessionSummary {
    pub session_id: SessionId,
    pub stage: WizardStage,
    pub current_round: u32,
    pub rounds: u32,
    pub completed_rounds: usize,
    pub warmup_score: Option<u8>,
    pub total_profit: i64,
    pub export_sent: bool,
    pub sync_status: SyncStatus,
    pub screen: ScreenView,
}

impl<R, S> StudyService<R, S>
where
    R: SessionRepository + 'static,
    S: ResultSink + 'static,
{
    pub fn new(repository: Arc<R>, sink: Arc<S>, context: StudyContext) -> Self {
        Self {
            repository,
            sink,
            context: Arc::new(context),
        }
    }

    pub fn context(&self) -> &StudyContext {
        &self.context
    }

    /// Opens a session in the lobby. `group` is required when frames are
    /// assigned by group number and ignored otherwise.
    pub fn start(&self, group: Option<&str>) -> Result<Session, StudyServiceError> {
        let frame = match self.context.config().frame_mode {
            FrameMode::Random => Frame::random(&mut rand::thread_rng()),
            FrameMode::Group => {
                let group = group.ok_or_else(|| {
                    SessionError::Validation("please enter your group number".to_string())
                })?;
                Frame::from_group(group)?
            }
        };

        let session = Session::new(next_session_id(), frame, Utc::now());
        let stored = self.repository.insert(session)?;
        info!(session = %stored.id(), frame = stored.frame().label(), "session started");
        Ok(stored)
    }

    pub fn session(&self, id: &SessionId) -> Result<Session, StudyServiceError> {
        let session = self
            .repository
            .fetch(id)?
            .ok_or(RepositoryError::NotFound)?;
        Ok(session)
    }

    /// Current screen. A finished session that has not been synced yet is
    /// finalized first.
    pub async fn view(&self, id: &SessionId) -> Result<SessionSummary, StudyServiceError> {
        let session = self.session(id)?;
        let session = if session.stage().is_terminal() && !session.export_sent() {
            self.finalize(id).await?
        } else {
            session
        };
        Ok(self.summary(&session))
    }

    pub async fn apply(
        &self,
        id: &SessionId,
        event: WizardEvent,
    ) -> Result<SessionSummary, StudyServiceError> {
        let session = self.session(id)?;
        let label = event.label();

        let next = match transition(&session, event, &self.context) {
            Ok(next) => next,
            Err(err) => {
                match &err {
                    SessionError::State(_) | SessionError::Demand(_) => {
                        error!(session = %id, event = label, error = %err, "rejected transition")
                    }
                    SessionError::Auth | SessionError::Validation(_) => {
                        info!(session = %id, event = label, error = %err, "submission refused")
                    }
                }
                return Err(err.into());
            }
        };

        if let Err(err) = self.repository.update(next.clone()) {
            warn!(session = %id, event = label, error = %err, "transition not stored");
            return Err(err.into());
        }
        let next = if next.stage().is_terminal() {
            info!(
                session = %id,
                rounds = next.round_records().len(),
                total_profit = next.total_profit(),
                "study completed"
            );
            self.finalize(id).await?
        } else {
            next
        };
        Ok(self.summary(&next))
    }

    /// Hands a finished session's rows to the sink, at most once. Failures
    /// are recorded on the session and never returned.
    pub async fn finalize(&self, id: &SessionId) -> Result<Session, StudyServiceError> {
        let session = self.session(id)?;
        if !session.stage().is_terminal() {
            return Err(StudyServiceError::NotFinished(id.clone()));
        }
        if !self.repository.claim_export(id)? {
            debug!(session = %id, "results already exported");
            return self.session(id);
        }

        let payload = SyncPayload::new(session.snapshot());
        let status = match self.sink.push(&payload).await {
            Ok(SyncReceipt::Delivered { status }) => {
                info!(session = %id, status, "results synced");
                SyncStatus::Delivered { status }
            }
            Ok(SyncReceipt::Skipped) => {
                debug!(session = %id, "no collection endpoint configured");
                SyncStatus::Skipped
            }
            Err(err) => {
                warn!(session = %id, error = %err, "result sync failed");
                SyncStatus::Failed {
                    reason: err.to_string(),
                }
            }
        };

        let mut stored = self.session(id)?;
        stored.record_sync(status);
        self.repository.update(stored.clone())?;
        Ok(stored)
    }

    pub fn export_csv(&self, id: &SessionId) -> Result<Vec<u8>, StudyServiceError> {
        let session = self.session(id)?;
        if !session.stage().is_terminal() {
            return Err(StudyServiceError::NotFinished(id.clone()));
        }
        Ok(export::export_csv(&session.snapshot())?)
    }

    pub fn summary(&self, session: &Session) -> SessionSummary {
        SessionSummary {
            session_id: session.id().clone(),
            stage: session.stage(),
            current_round: session.current_round(),
            rounds: self.context.config().rounds,
            completed_rounds: session.round_records().len(),
            warmup_score: session.warmup_score(),
            total_profit: session.total_profit(),
            export_sent: session.export_sent(),
            sync_status: session.sync_status().clone(),
            screen: render(session, &self.context),
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum StudyServiceError {
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error(transparent)]
    Export(#[from] ExportError),
    #[error("session {0} has not finished the study yet")]
    NotFinished(SessionId),
}
