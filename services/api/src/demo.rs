use crate::infra::{build_service, OrderScript};
use chrono::Local;
use clap::Args;
use newsvendor_lab::config::AppConfig;
use newsvendor_lab::error::AppError;
use newsvendor_lab::telemetry::{self, LogOutput};
use newsvendor_lab::workflows::study::survey::{self, SurveyInput};
use newsvendor_lab::workflows::study::warmup;
use newsvendor_lab::workflows::study::{
    FormAnswers, FormValue, ResultSink, Session, SessionError, SessionRepository, StudyService,
    StudyServiceError, SyncStatus, WizardEvent,
};
use std::path::PathBuf;

/// Group number used when frames are assigned by group.
const DEMO_GROUP: &str = "1";

#[derive(Args, Debug)]
pub(crate) struct DemoArgs {
    /// Order quantity for every round, comma separated (e.g. 100,90,120)
    #[arg(long, value_parser = crate::infra::parse_orders)]
    pub(crate) orders: OrderScript,
    /// Write the results CSV to this path
    #[arg(long)]
    pub(crate) output: Option<PathBuf>,
}

pub(crate) async fn run_demo(args: DemoArgs) -> Result<(), AppError> {
    let DemoArgs { orders, output } = args;

    let config = AppConfig::load()?;
    telemetry::init(&config.telemetry, LogOutput::Stderr)?;
    let service = build_service(&config)?;

    println!("Newsvendor scripted participant");
    let session = play_scripted(&service, &orders).await?;
    render_session(&session);

    if let Some(path) = output {
        let csv = service.export_csv(session.id())?;
        std::fs::write(&path, csv)?;
        println!("Results written to {}", path.display());
    }
    Ok(())
}

/// Walks a participant who answers the warm-up correctly, places the given
/// orders, and picks the first option (or the neutral rating) in the survey.
pub(crate) async fn play_scripted<R, S>(
    service: &StudyService<R, S>,
    orders: &OrderScript,
) -> Result<Session, AppError>
where
    R: SessionRepository + 'static,
    S: ResultSink + 'static,
{
    let config = service.context().config();
    if orders.0.len() != config.rounds as usize {
        return Err(StudyServiceError::Session(SessionError::Validation(format!(
            "the study runs {} rounds but {} orders were given",
            config.rounds,
            orders.0.len()
        )))
        .into());
    }

    let session = service.start(Some(DEMO_GROUP))?;
    let id = session.id().clone();

    let mut warmup_answers = FormAnswers::new();
    for question in warmup::questions(config.pricing()) {
        warmup_answers.insert(question.key.to_string(), FormValue::Text(question.correct));
    }

    let mut events = vec![
        WizardEvent::EnterCode {
            code: config.access_code.clone(),
        },
        WizardEvent::ConfirmIntro,
        WizardEvent::SubmitWarmup {
            answers: warmup_answers,
        },
        WizardEvent::StartRounds,
    ];
    events.extend(orders.0.iter().map(|order| WizardEvent::SubmitOrder {
        order: FormValue::Integer(i64::from(*order)),
    }));
    events.push(WizardEvent::ConfirmRounds);
    events.push(WizardEvent::SubmitSurvey {
        answers: scripted_survey(),
    });

    for event in events {
        service.apply(&id, event).await?;
    }
    Ok(service.session(&id)?)
}

fn scripted_survey() -> FormAnswers {
    survey::questions()
        .into_iter()
        .map(|question| {
            let value = match question.input {
                SurveyInput::Choice { options } => {
                    FormValue::from(options.first().copied().unwrap_or_default())
                }
                SurveyInput::Likert { default, .. } => FormValue::Integer(default),
            };
            (question.key.to_string(), value)
        })
        .collect()
}

fn render_session(session: &Session) {
    println!(
        "- Session {} | {} frame | warm-up score {}/{}",
        session.id(),
        session.frame().label(),
        session.warmup_score().unwrap_or_default(),
        warmup::QUESTION_COUNT
    );
    for record in session.round_records() {
        println!(
            "  - Round {:>2}: ordered {:>3} | demand {:>3} | profit ${}",
            record.round, record.order, record.demand, record.profit
        );
    }
    println!("- Total profit: ${}", session.total_profit());
    if let Some(completed) = session.completed_at() {
        println!(
            "- Completed at {}",
            completed.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S")
        );
    }
    match session.sync_status() {
        SyncStatus::Failed { reason } => println!("- Upload failed: {reason}"),
        status => println!("- Upload: {}", status.label()),
    }
}
