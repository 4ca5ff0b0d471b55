//! Presentation-neutral description of the screen a session is on.
//!
//! Rendering reads the session and the study parameters only. In particular
//! demand is always described as uniformly random over the configured range,
//! whichever demand source actually drives the rounds.

use serde::Serialize;

use super::config::{StudyConfig, MAX_ORDER};
use super::domain::{Frame, RoundRecord, SyncStatus, WizardStage};
use super::scoring::score;
use super::session::Session;
use super::survey::{self, SurveyInput};
use super::warmup;
use super::wizard::StudyContext;

pub const DEFAULT_ORDER: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeTone {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notice {
    pub tone: NoticeTone,
    pub text: String,
}

impl Notice {
    fn new(tone: NoticeTone, text: impl Into<String>) -> Self {
        Self {
            tone,
            text: text.into(),
        }
    }
}

/// What the participant learns about the previous round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundFeedback {
    pub round: u32,
    pub order: u32,
    pub demand: u32,
    pub summary: String,
    pub outcome: Notice,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum FieldKind {
    Secret,
    Choice {
        options: Vec<String>,
    },
    Integer {
        min: i64,
        max: i64,
        default: i64,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FormField {
    pub key: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,
    pub label: String,
    pub kind: FieldKind,
}

/// The button that submits the screen and the event it produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubmitAction {
    pub event: &'static str,
    pub label: &'static str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScreenView {
    pub stage: WizardStage,
    pub title: String,
    pub paragraphs: Vec<String>,
    pub notices: Vec<Notice>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback: Option<RoundFeedback>,
    pub fields: Vec<FormField>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submit: Option<SubmitAction>,
}

impl ScreenView {
    fn new(stage: WizardStage, title: impl Into<String>) -> Self {
        Self {
            stage,
            title: title.into(),
            paragraphs: Vec::new(),
            notices: Vec::new(),
            feedback: None,
            fields: Vec::new(),
            submit: None,
        }
    }

    fn paragraph(mut self, text: impl Into<String>) -> Self {
        self.paragraphs.push(text.into());
        self
    }

    fn notice(mut self, tone: NoticeTone, text: impl Into<String>) -> Self {
        self.notices.push(Notice::new(tone, text));
        self
    }

    fn submit(mut self, event: &'static str, label: &'static str) -> Self {
        self.submit = Some(SubmitAction { event, label });
        self
    }
}

pub fn render(session: &Session, context: &StudyContext) -> ScreenView {
    let config = context.config();
    match session.stage() {
        WizardStage::Lobby => lobby(),
        WizardStage::Intro => intro(config),
        WizardStage::Warmup => warmup_screen(config),
        WizardStage::PreTransition => pre_transition(config),
        WizardStage::DecisionRound => decision_round(session, config),
        WizardStage::PostTransition => post_transition(),
        WizardStage::Survey => survey_screen(),
        WizardStage::Done => done(session),
    }
}

fn lobby() -> ScreenView {
    let mut view = ScreenView::new(WizardStage::Lobby, "Welcome")
        .notice(
            NoticeTone::Info,
            "Please wait for the instructor to provide the Access Code.",
        )
        .paragraph("Do not close this window.")
        .submit("enter_code", "Enter Experiment");
    view.fields.push(FormField {
        key: "code".to_string(),
        section: None,
        label: "Enter Access Code to Start:".to_string(),
        kind: FieldKind::Secret,
    });
    view
}

fn intro(config: &StudyConfig) -> ScreenView {
    let margin_class = if config.pricing().is_high_margin() {
        "High Margin"
    } else {
        "Low Margin"
    };

    ScreenView::new(WizardStage::Intro, "Experiment: Inventory Management")
        .paragraph("You are participating in a study on decision-making in supply chains.")
        .paragraph(
            "You are a procurement manager for a company selling eco-friendly winter tires.",
        )
        .paragraph("Each week (\"Round\"), you must decide how many tires to order.")
        .paragraph(format!(
            "Demand is uncertain: It will be a random number between {} and {} every week.",
            config.demand_min, config.demand_max
        ))
        .paragraph(format!("Product Type: This is a {margin_class} Product."))
        .notice(
            NoticeTone::Info,
            format!(
                "Key Financials: Selling Price (p) = ${} | Unit Cost (c) = ${}",
                config.price, config.cost
            ),
        )
        .submit("confirm_intro", "Go to Warm-Up")
}

fn warmup_screen(config: &StudyConfig) -> ScreenView {
    let mut view = ScreenView::new(WizardStage::Warmup, "Warm-Up Questions")
        .paragraph("Please answer the following to verify your understanding.")
        .paragraph(format!(
            "Reference Values: Price (p)=${} | Cost (c)=${}",
            config.price, config.cost
        ))
        .submit("submit_warmup", "Check Answers & Continue");

    view.fields = warmup::questions(config.pricing())
        .into_iter()
        .map(|question| FormField {
            key: question.key.to_string(),
            section: Some(question.heading),
            label: question.prompt,
            kind: FieldKind::Choice {
                options: question.options,
            },
        })
        .collect();
    view
}

fn pre_transition(config: &StudyConfig) -> ScreenView {
    ScreenView::new(WizardStage::PreTransition, "Ready to Start")
        .notice(NoticeTone::Success, "Warm-up complete!")
        .paragraph(format!("You will play {} rounds.", config.rounds))
        .notice(NoticeTone::Warning, "Click below to begin Round 1.")
        .submit("start_rounds", "Start Experiment")
}

fn decision_round(session: &Session, config: &StudyConfig) -> ScreenView {
    let margin = config.pricing().unit_margin();
    let mut view = ScreenView::new(
        WizardStage::DecisionRound,
        format!("Round {} of {}", session.current_round(), config.rounds),
    )
    .paragraph(format!(
        "Selling Price (p): ${} | Unit Cost (c): ${}",
        config.price, config.cost
    ))
    .paragraph(format!(
        "Demand: Uniformly distributed between {} and {}",
        config.demand_min, config.demand_max
    ));

    view = match session.frame() {
        Frame::Positive => view
            .paragraph("Goal: Maximize your profit.")
            .paragraph(format!(
                "If Demand < Order: You earn ${margin} on every unit sold."
            ))
            .paragraph(format!(
                "If Demand > Order: You earn a profit of ${margin} on each unit ordered."
            )),
        Frame::Negative => view
            .paragraph("Goal: Minimize your losses.")
            .paragraph(format!(
                "If Demand < Order: You LOSE ${} on every product you throw away.",
                config.cost
            ))
            .paragraph(format!(
                "If Demand > Order: You LOSE ${margin} of profit for every demand you could not meet."
            )),
    };

    view.feedback = session
        .last_round()
        .map(|record| round_feedback(record, config));
    view.fields.push(FormField {
        key: "order".to_string(),
        section: None,
        label: "How many tires do you want to order?".to_string(),
        kind: FieldKind::Integer {
            min: 0,
            max: i64::from(MAX_ORDER),
            default: DEFAULT_ORDER,
        },
    });
    view.submit("submit_order", "Submit Order")
}

fn round_feedback(record: &RoundRecord, config: &StudyConfig) -> RoundFeedback {
    let outcome = score(record.order, record.demand, config.pricing());
    let notice = match record.frame {
        Frame::Positive => Notice::new(
            NoticeTone::Success,
            format!("You earned a profit of ${}", record.profit),
        ),
        Frame::Negative if record.demand < record.order => Notice::new(
            NoticeTone::Error,
            format!(
                "You LOST ${} on products you had to throw away.",
                outcome.waste_loss
            ),
        ),
        Frame::Negative => Notice::new(
            NoticeTone::Error,
            format!(
                "You LOST ${} of profit for demand you could not meet.",
                outcome.opportunity_loss
            ),
        ),
    };

    RoundFeedback {
        round: record.round,
        order: record.order,
        demand: record.demand,
        summary: format!(
            "Result from Round {}: You ordered {}. Demand was {}.",
            record.round, record.order, record.demand
        ),
        outcome: notice,
    }
}

fn post_transition() -> ScreenView {
    ScreenView::new(WizardStage::PostTransition, "Experiment Rounds Completed")
        .notice(NoticeTone::Success, "You have finished the ordering game.")
        .paragraph("Please click below to begin the final short survey.")
        .submit("confirm_rounds", "Start Survey")
}

fn survey_screen() -> ScreenView {
    let mut view =
        ScreenView::new(WizardStage::Survey, "Final Survey").submit("submit_survey", "Submit Survey");
    view.fields = survey::questions()
        .into_iter()
        .map(|question| FormField {
            key: question.key.to_string(),
            section: Some(question.section.to_string()),
            label: question.prompt.to_string(),
            kind: match question.input {
                SurveyInput::Choice { options } => FieldKind::Choice {
                    options: options.iter().map(|option| option.to_string()).collect(),
                },
                SurveyInput::Likert { min, max, default } => {
                    FieldKind::Integer { min, max, default }
                }
            },
        })
        .collect();
    view
}

fn done(session: &Session) -> ScreenView {
    let view = ScreenView::new(WizardStage::Done, "Thank You!")
        .notice(
            NoticeTone::Success,
            "Please download your results and submit them.",
        )
        .paragraph(format!(
            "Rounds played: {} | Total profit: ${}",
            session.round_records().len(),
            session.total_profit()
        ));

    match session.sync_status() {
        SyncStatus::Delivered { .. } => view.notice(
            NoticeTone::Info,
            "Your results were also uploaded automatically.",
        ),
        SyncStatus::Failed { reason } => view.notice(
            NoticeTone::Warning,
            format!(
                "Automatic upload failed ({reason}). Your download is unaffected; please submit the file manually."
            ),
        ),
        SyncStatus::NotAttempted | SyncStatus::Skipped => view,
    }
}
