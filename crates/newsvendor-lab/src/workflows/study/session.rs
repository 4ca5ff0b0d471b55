use chrono::{DateTime, Utc};
use serde::Serialize;

use super::domain::{Frame, RoundRecord, SessionError, SessionId, SyncStatus, WizardStage};
use super::export::{ExportRow, ExportValue};
use super::repository::RepositoryError;
use super::survey::SurveyAnswers;
use super::warmup::QUESTION_COUNT;

/// Everything recorded for one participant run.
///
/// Rounds are append-only and the warm-up score and survey answers are
/// written once. The frame is fixed when the session is created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    id: SessionId,
    stage: WizardStage,
    frame: Frame,
    current_round: u32,
    round_records: Vec<RoundRecord>,
    warmup_score: Option<u8>,
    survey_answers: Option<SurveyAnswers>,
    export_sent: bool,
    sync_status: SyncStatus,
    started_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
    revision: u64,
}

impl Session {
    pub fn new(id: SessionId, frame: Frame, started_at: DateTime<Utc>) -> Self {
        Self {
            id,
            stage: WizardStage::Lobby,
            frame,
            current_round: 1,
            round_records: Vec::new(),
            warmup_score: None,
            survey_answers: None,
            export_sent: false,
            sync_status: SyncStatus::NotAttempted,
            started_at,
            completed_at: None,
            revision: 0,
        }
    }

    pub fn id(&self) -> &SessionId {
        &self.id
    }

    pub fn stage(&self) -> WizardStage {
        self.stage
    }

    pub fn frame(&self) -> Frame {
        self.frame
    }

    pub fn current_round(&self) -> u32 {
        self.current_round
    }

    pub fn round_records(&self) -> &[RoundRecord] {
        &self.round_records
    }

    pub fn last_round(&self) -> Option<&RoundRecord> {
        self.round_records.last()
    }

    pub fn warmup_score(&self) -> Option<u8> {
        self.warmup_score
    }

    pub fn survey_answers(&self) -> Option<&SurveyAnswers> {
        self.survey_answers.as_ref()
    }

    pub fn export_sent(&self) -> bool {
        self.export_sent
    }

    pub fn sync_status(&self) -> &SyncStatus {
        &self.sync_status
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn completed_at(&self) -> Option<DateTime<Utc>> {
        self.completed_at
    }

    pub fn total_profit(&self) -> i64 {
        self.round_records.iter().map(|record| record.profit).sum()
    }

    /// Appends the result of the round currently being played.
    pub fn append_round(&mut self, record: RoundRecord) -> Result<(), SessionError> {
        if self.stage != WizardStage::DecisionRound {
            return Err(SessionError::State(format!(
                "cannot record a round while in {}",
                self.stage.label()
            )));
        }
        if self.round_records.len() as u32 != self.current_round - 1 {
            return Err(SessionError::State(format!(
                "round log holds {} entries but round {} is in play",
                self.round_records.len(),
                self.current_round
            )));
        }
        if record.round != self.current_round {
            return Err(SessionError::State(format!(
                "record for round {} submitted during round {}",
                record.round, self.current_round
            )));
        }
        if record.frame != self.frame {
            return Err(SessionError::State(
                "record frame differs from the session frame".to_string(),
            ));
        }

        self.round_records.push(record);
        Ok(())
    }

    pub fn set_warmup_score(&mut self, score: u8) -> Result<(), SessionError> {
        if self.warmup_score.is_some() {
            return Err(SessionError::State(
                "warm-up score already recorded".to_string(),
            ));
        }
        if score > QUESTION_COUNT {
            return Err(SessionError::State(format!(
                "warm-up score {score} exceeds {QUESTION_COUNT}"
            )));
        }
        self.warmup_score = Some(score);
        Ok(())
    }

    pub fn set_survey_answers(&mut self, answers: SurveyAnswers) -> Result<(), SessionError> {
        if self.survey_answers.is_some() {
            return Err(SessionError::State(
                "survey answers already recorded".to_string(),
            ));
        }
        self.survey_answers = Some(answers);
        Ok(())
    }

    /// Flattened rows for export: one per round, each carrying the warm-up
    /// score and every survey answer.
    pub fn snapshot(&self) -> Vec<ExportRow> {
        self.round_records
            .iter()
            .map(|record| {
                let mut row = ExportRow::new();
                row.push("Round", ExportValue::Integer(i64::from(record.round)));
                row.push("Frame", ExportValue::Text(record.frame.label().to_string()));
                row.push("Order", ExportValue::Integer(i64::from(record.order)));
                row.push("Demand", ExportValue::Integer(i64::from(record.demand)));
                row.push("Profit", ExportValue::Integer(record.profit));
                row.push(
                    "WarmUp_Score",
                    ExportValue::Integer(i64::from(self.warmup_score.unwrap_or(0))),
                );
                if let Some(answers) = &self.survey_answers {
                    for (key, value) in answers.entries() {
                        row.push(key.clone(), value.clone());
                    }
                }
                row
            })
            .collect()
    }

    /// Number of writes the stored copy of this session has seen.
    pub fn revision(&self) -> u64 {
        self.revision
    }

    /// Stamps `self` as the write following `stored`. Fails with
    /// `RepositoryError::Stale` when `self` was derived from an older copy.
    pub fn supersede(mut self, stored: &Session) -> Result<Session, RepositoryError> {
        if self.revision != stored.revision {
            return Err(RepositoryError::Stale);
        }
        self.revision = stored.revision + 1;
        Ok(self)
    }

    /// Marks the results as handed to the sink. Returns `false` when an
    /// earlier call already did so.
    pub fn claim_export(&mut self) -> bool {
        if self.export_sent {
            return false;
        }
        self.export_sent = true;
        self.revision += 1;
        true
    }

    pub fn record_sync(&mut self, status: SyncStatus) {
        self.sync_status = status;
    }

    pub(super) fn enter(&mut self, stage: WizardStage) {
        self.stage = stage;
        if stage.is_terminal() && self.completed_at.is_none() {
            self.completed_at = Some(Utc::now());
        }
    }

    pub(super) fn advance_round(&mut self) {
        self.current_round += 1;
    }
}
