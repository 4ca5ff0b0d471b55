use serde::{Deserialize, Serialize};
use tracing::debug;

use super::config::{StudyConfig, MAX_ORDER};
use super::demand::{demand_source_for, DemandSource};
use super::domain::{FormAnswers, FormValue, RoundRecord, SessionError, WizardStage};
use super::scoring::score;
use super::session::Session;
use super::{survey, warmup};

/// A participant action submitted from the current screen.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WizardEvent {
    EnterCode { code: String },
    ConfirmIntro,
    SubmitWarmup { answers: FormAnswers },
    StartRounds,
    SubmitOrder { order: FormValue },
    ConfirmRounds,
    SubmitSurvey { answers: FormAnswers },
}

impl WizardEvent {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::EnterCode { .. } => "enter_code",
            Self::ConfirmIntro => "confirm_intro",
            Self::SubmitWarmup { .. } => "submit_warmup",
            Self::StartRounds => "start_rounds",
            Self::SubmitOrder { .. } => "submit_order",
            Self::ConfirmRounds => "confirm_rounds",
            Self::SubmitSurvey { .. } => "submit_survey",
        }
    }
}

/// Study parameters plus the demand source used for every session.
#[derive(Debug)]
pub struct StudyContext {
    config: StudyConfig,
    demand: Box<dyn DemandSource>,
}

impl StudyContext {
    pub fn new(config: StudyConfig, demand: Box<dyn DemandSource>) -> Self {
        Self { config, demand }
    }

    pub fn from_config(config: StudyConfig) -> Self {
        let demand = demand_source_for(&config);
        Self::new(config, demand)
    }

    pub fn config(&self) -> &StudyConfig {
        &self.config
    }

    pub fn demand(&self) -> &dyn DemandSource {
        self.demand.as_ref()
    }
}

type Handler = fn(Session, WizardEvent, &StudyContext) -> Result<Session, SessionError>;

fn handler_for(stage: WizardStage) -> Handler {
    match stage {
        WizardStage::Lobby => lobby,
        WizardStage::Intro => intro,
        WizardStage::Warmup => warmup_quiz,
        WizardStage::PreTransition => pre_transition,
        WizardStage::DecisionRound => decision_round,
        WizardStage::PostTransition => post_transition,
        WizardStage::Survey => closing_survey,
        WizardStage::Done => done,
    }
}

/// Applies `event` to a copy of `session`. On error the original session is
/// left as it was.
pub fn transition(
    session: &Session,
    event: WizardEvent,
    context: &StudyContext,
) -> Result<Session, SessionError> {
    let from = session.stage();
    let label = event.label();
    let next = handler_for(from)(session.clone(), event, context)?;
    debug!(
        session = %next.id(),
        event = label,
        from = from.label(),
        to = next.stage().label(),
        "wizard transition"
    );
    Ok(next)
}

fn unexpected(stage: WizardStage, event: &WizardEvent) -> SessionError {
    SessionError::State(format!(
        "'{}' is not accepted on the {} screen",
        event.label(),
        stage.label()
    ))
}

fn lobby(
    mut session: Session,
    event: WizardEvent,
    context: &StudyContext,
) -> Result<Session, SessionError> {
    match event {
        WizardEvent::EnterCode { code } if code == context.config.access_code => {
            session.enter(WizardStage::Intro);
            Ok(session)
        }
        WizardEvent::EnterCode { .. } => Err(SessionError::Auth),
        other => Err(unexpected(WizardStage::Lobby, &other)),
    }
}

fn intro(
    mut session: Session,
    event: WizardEvent,
    _context: &StudyContext,
) -> Result<Session, SessionError> {
    match event {
        WizardEvent::ConfirmIntro => {
            session.enter(WizardStage::Warmup);
            Ok(session)
        }
        other => Err(unexpected(WizardStage::Intro, &other)),
    }
}

fn warmup_quiz(
    mut session: Session,
    event: WizardEvent,
    context: &StudyContext,
) -> Result<Session, SessionError> {
    match event {
        WizardEvent::SubmitWarmup { answers } => {
            let score = warmup::grade(&answers, context.config.pricing())?;
            session.set_warmup_score(score)?;
            session.enter(WizardStage::PreTransition);
            Ok(session)
        }
        other => Err(unexpected(WizardStage::Warmup, &other)),
    }
}

fn pre_transition(
    mut session: Session,
    event: WizardEvent,
    _context: &StudyContext,
) -> Result<Session, SessionError> {
    match event {
        WizardEvent::StartRounds => {
            session.enter(WizardStage::DecisionRound);
            Ok(session)
        }
        other => Err(unexpected(WizardStage::PreTransition, &other)),
    }
}

fn decision_round(
    mut session: Session,
    event: WizardEvent,
    context: &StudyContext,
) -> Result<Session, SessionError> {
    let order = match event {
        WizardEvent::SubmitOrder { order } => parse_order(&order)?,
        other => return Err(unexpected(WizardStage::DecisionRound, &other)),
    };

    let round = session.current_round();
    let frame = session.frame();
    let demand = context.demand.next_demand(round)?;
    let outcome = score(order, demand, context.config.pricing());

    session.append_round(RoundRecord {
        round,
        frame,
        order,
        demand,
        profit: outcome.profit,
    })?;

    if round < context.config.rounds {
        session.advance_round();
    } else {
        session.enter(WizardStage::PostTransition);
    }
    Ok(session)
}

fn parse_order(raw: &FormValue) -> Result<u32, SessionError> {
    let value = raw.integer().ok_or_else(|| {
        SessionError::Validation(format!(
            "order must be a whole number, got '{}'",
            raw.text()
        ))
    })?;

    u32::try_from(value)
        .ok()
        .filter(|order| *order <= MAX_ORDER)
        .ok_or_else(|| {
            SessionError::Validation(format!(
                "order must be between 0 and {MAX_ORDER}, got {value}"
            ))
        })
}

fn post_transition(
    mut session: Session,
    event: WizardEvent,
    _context: &StudyContext,
) -> Result<Session, SessionError> {
    match event {
        WizardEvent::ConfirmRounds => {
            session.enter(WizardStage::Survey);
            Ok(session)
        }
        other => Err(unexpected(WizardStage::PostTransition, &other)),
    }
}

fn closing_survey(
    mut session: Session,
    event: WizardEvent,
    _context: &StudyContext,
) -> Result<Session, SessionError> {
    match event {
        WizardEvent::SubmitSurvey { answers } => {
            let answers = survey::validate(&answers)?;
            session.set_survey_answers(answers)?;
            session.enter(WizardStage::Done);
            Ok(session)
        }
        other => Err(unexpected(WizardStage::Survey, &other)),
    }
}

fn done(
    _session: Session,
    event: WizardEvent,
    _context: &StudyContext,
) -> Result<Session, SessionError> {
    Err(unexpected(WizardStage::Done, &event))
}
