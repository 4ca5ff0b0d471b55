use std::collections::BTreeMap;
use std::fmt;

use rand::Rng;
use serde::{Deserialize, Serialize};

use super::demand::DemandError;

#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Experimental condition deciding how round results are described.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Frame {
    /// Results are reported as profit earned.
    Positive,
    /// Results are reported as money lost to waste or missed demand.
    Negative,
}

impl Frame {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Positive => "Positive",
            Self::Negative => "Negative",
        }
    }

    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        if rng.gen_bool(0.5) {
            Self::Positive
        } else {
            Self::Negative
        }
    }

    /// Maps the operator-issued group number onto a frame.
    pub fn from_group(raw: &str) -> Result<Self, SessionError> {
        match raw.trim() {
            "1" => Ok(Self::Positive),
            "2" => Ok(Self::Negative),
            other => Err(SessionError::Validation(format!(
                "group number must be 1 or 2, got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WizardStage {
    Lobby,
    Intro,
    Warmup,
    PreTransition,
    DecisionRound,
    PostTransition,
    Survey,
    Done,
}

impl WizardStage {
    pub const fn ordered() -> [Self; 8] {
        [
            Self::Lobby,
            Self::Intro,
            Self::Warmup,
            Self::PreTransition,
            Self::DecisionRound,
            Self::PostTransition,
            Self::Survey,
            Self::Done,
        ]
    }

    pub const fn label(self) -> &'static str {
        match self {
            Self::Lobby => "Lobby",
            Self::Intro => "Introduction",
            Self::Warmup => "Warm-Up",
            Self::PreTransition => "Ready to Start",
            Self::DecisionRound => "Decision Round",
            Self::PostTransition => "Rounds Completed",
            Self::Survey => "Final Survey",
            Self::Done => "Thank You",
        }
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Outcome of one ordering round. Never mutated after it is appended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundRecord {
    pub round: u32,
    pub frame: Frame,
    pub order: u32,
    pub demand: u32,
    pub profit: i64,
}

/// A submitted form value. JSON clients may send numbers or strings; the
/// terminal runner always sends text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FormValue {
    Integer(i64),
    Text(String),
}

impl FormValue {
    pub fn text(&self) -> String {
        match self {
            Self::Integer(value) => value.to_string(),
            Self::Text(value) => value.trim().to_string(),
        }
    }

    pub fn integer(&self) -> Option<i64> {
        match self {
            Self::Integer(value) => Some(*value),
            Self::Text(value) => value.trim().parse().ok(),
        }
    }
}

impl From<&str> for FormValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<i64> for FormValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

pub type FormAnswers = BTreeMap<String, FormValue>;

/// Result of the one-shot upload of a finished session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SyncStatus {
    NotAttempted,
    Delivered { status: u16 },
    Skipped,
    Failed { reason: String },
}

impl SyncStatus {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::NotAttempted => "Not Attempted",
            Self::Delivered { .. } => "Delivered",
            Self::Skipped => "Skipped",
            Self::Failed { .. } => "Failed",
        }
    }
}

/// Errors raised while moving a session through the wizard.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("incorrect access code, please wait for the instructor")]
    Auth,
    #[error("{0}")]
    Validation(String),
    #[error("operation not allowed: {0}")]
    State(String),
    #[error(transparent)]
    Demand(#[from] DemandError),
}

impl SessionError {
    /// Whether the participant can fix the problem by resubmitting.
    pub const fn is_recoverable(&self) -> bool {
        matches!(self, Self::Auth | Self::Validation(_))
    }
}
