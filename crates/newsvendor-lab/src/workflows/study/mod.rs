//! Newsvendor ordering study: a single participant walks from the lobby
//! through a warm-up quiz, a fixed number of ordering rounds, and a closing
//! survey before the accumulated record is exported.

mod config;
pub mod demand;
pub mod domain;
pub mod export;
pub mod repository;
pub mod router;
pub mod scoring;
pub mod service;
pub mod session;
pub mod sink;
pub mod survey;
pub mod view;
pub mod warmup;
pub mod wizard;

#[cfg(test)]
mod tests;

pub use config::{DemandMode, FrameMode, StudyConfig, StudyConfigError, MAX_ORDER};
pub use demand::{demand_source_for, DemandError, DemandSource, FixedSequence, RandomUniform};
pub use domain::{
    Frame, FormAnswers, FormValue, RoundRecord, SessionError, SessionId, SyncStatus, WizardStage,
};
pub use export::{export_csv, ExportError, ExportRow, ExportValue, SyncPayload};
pub use repository::{RepositoryError, SessionRepository};
pub use router::{study_router, StartRequest, RESULTS_FILE_NAME};
pub use scoring::{score, Pricing, RoundOutcome};
pub use service::{SessionSummary, StudyService, StudyServiceError};
pub use session::Session;
pub use sink::{HttpResultSink, ResultSink, SyncError, SyncReceipt};
pub use view::{
    render, FieldKind, FormField, Notice, NoticeTone, RoundFeedback, ScreenView, SubmitAction,
};
pub use wizard::{transition, StudyContext, WizardEvent};
