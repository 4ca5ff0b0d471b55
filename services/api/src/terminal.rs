//! Interactive participant session on a plain terminal.

use crate::infra::build_service;
use clap::Args;
use newsvendor_lab::config::AppConfig;
use newsvendor_lab::error::AppError;
use newsvendor_lab::telemetry::{self, LogOutput};
use newsvendor_lab::workflows::study::{
    DemandMode, FieldKind, FormAnswers, FormField, FormValue, FrameMode, NoticeTone, ResultSink,
    ScreenView, Session, SessionError, SessionRepository, StudyService, StudyServiceError,
    SyncStatus, WizardEvent, RESULTS_FILE_NAME,
};
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use tracing::info;

#[derive(Args, Debug)]
pub(crate) struct RunArgs {
    /// Where to write the results CSV
    #[arg(long, default_value = RESULTS_FILE_NAME)]
    pub(crate) output: PathBuf,
    /// Group number handed out by the instructor (1 or 2)
    #[arg(long)]
    pub(crate) group: Option<String>,
    /// Seed for randomly drawn demand
    #[arg(long)]
    pub(crate) seed: Option<u64>,
}

pub(crate) async fn run_terminal(args: RunArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;
    if let (Some(seed), DemandMode::Random { seed: slot }) =
        (args.seed, &mut config.study.demand_mode)
    {
        *slot = Some(seed);
    }
    if args.group.is_some() {
        config.study.frame_mode = FrameMode::Group;
    }

    telemetry::init(&config.telemetry, LogOutput::Stderr)?;
    let service = build_service(&config)?;

    let stdin = io::stdin();
    let mut input = stdin.lock();
    let mut output = io::stdout().lock();
    let session = play(&service, args.group.as_deref(), &mut input, &mut output).await?;

    let csv = service.export_csv(session.id())?;
    std::fs::write(&args.output, csv)?;
    writeln!(output, "Results written to {}", args.output.display())?;
    info!(
        session = %session.id(),
        path = %args.output.display(),
        sync = session.sync_status().label(),
        "terminal session finished"
    );
    Ok(())
}

/// Drives one session from the lobby to the done screen, re-prompting after
/// every refused submission.
pub(crate) async fn play<R, S, I, O>(
    service: &StudyService<R, S>,
    group: Option<&str>,
    input: &mut I,
    output: &mut O,
) -> Result<Session, AppError>
where
    R: SessionRepository + 'static,
    S: ResultSink + 'static,
    I: BufRead,
    O: Write,
{
    let session = start_session(service, group, input, output)?;
    let id = session.id().clone();
    let mut summary = service.summary(&session);

    loop {
        print_screen(&summary.screen, output)?;
        let Some(action) = summary.screen.submit.clone() else {
            break;
        };

        let answers = collect_answers(&summary.screen.fields, action.label, input, output)?;
        let event = event_for(action.event, answers)?;
        match service.apply(&id, event).await {
            Ok(next) => summary = next,
            Err(StudyServiceError::Session(err)) if err.is_recoverable() => {
                writeln!(output, "\n! {err}")?;
            }
            Err(err) => return Err(err.into()),
        }
    }

    if let SyncStatus::Failed { reason } = &summary.sync_status {
        writeln!(output, "(upload failed: {reason})")?;
    }
    Ok(service.session(&id)?)
}

fn start_session<R, S, I, O>(
    service: &StudyService<R, S>,
    preset: Option<&str>,
    input: &mut I,
    output: &mut O,
) -> Result<Session, AppError>
where
    R: SessionRepository + 'static,
    S: ResultSink + 'static,
    I: BufRead,
    O: Write,
{
    if service.context().config().frame_mode != FrameMode::Group {
        return Ok(service.start(None)?);
    }

    let mut preset = preset.map(str::to_string);
    loop {
        let group = match preset.take() {
            Some(group) => group,
            None => prompt(input, output, "Please enter your group number: ")?,
        };
        match service.start(Some(&group)) {
            Ok(session) => return Ok(session),
            Err(StudyServiceError::Session(err)) if err.is_recoverable() => {
                writeln!(output, "! {err}")?;
            }
            Err(err) => return Err(err.into()),
        }
    }
}

fn prompt<I: BufRead, O: Write>(input: &mut I, output: &mut O, label: &str) -> io::Result<String> {
    write!(output, "{label}")?;
    output.flush()?;
    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        return Err(io::Error::new(
            io::ErrorKind::UnexpectedEof,
            "input closed before the study finished",
        ));
    }
    Ok(line.trim_end_matches(['\r', '\n']).to_string())
}

fn tone_label(tone: NoticeTone) -> &'static str {
    match tone {
        NoticeTone::Info => "info",
        NoticeTone::Success => "ok",
        NoticeTone::Warning => "warning",
        NoticeTone::Error => "!",
    }
}

fn print_screen<O: Write>(screen: &ScreenView, output: &mut O) -> io::Result<()> {
    writeln!(output, "\n== {} ==", screen.title)?;
    if let Some(feedback) = &screen.feedback {
        writeln!(output, "{}", feedback.summary)?;
        writeln!(
            output,
            "[{}] {}",
            tone_label(feedback.outcome.tone),
            feedback.outcome.text
        )?;
    }
    for notice in &screen.notices {
        writeln!(output, "[{}] {}", tone_label(notice.tone), notice.text)?;
    }
    for paragraph in &screen.paragraphs {
        writeln!(output, "{paragraph}")?;
    }
    Ok(())
}

fn collect_answers<I: BufRead, O: Write>(
    fields: &[FormField],
    submit_label: &str,
    input: &mut I,
    output: &mut O,
) -> io::Result<FormAnswers> {
    let mut answers = FormAnswers::new();
    if fields.is_empty() {
        prompt(input, output, &format!("[Enter] {submit_label} "))?;
        return Ok(answers);
    }

    for field in fields {
        if let Some(section) = &field.section {
            writeln!(output, "\n{section}")?;
        }
        let value = match &field.kind {
            FieldKind::Secret => prompt(input, output, &format!("{} ", field.label))?,
            FieldKind::Choice { options } => {
                writeln!(output, "{}", field.label)?;
                for (index, option) in options.iter().enumerate() {
                    writeln!(output, "  {}) {option}", index + 1)?;
                }
                let raw = prompt(input, output, &format!("Choice [1-{}]: ", options.len()))?;
                raw.trim()
                    .parse::<usize>()
                    .ok()
                    .and_then(|choice| choice.checked_sub(1))
                    .and_then(|index| options.get(index))
                    .cloned()
                    .unwrap_or(raw)
            }
            FieldKind::Integer { min, max, default } => {
                let raw = prompt(
                    input,
                    output,
                    &format!("{} ({min}-{max}) [{default}]: ", field.label),
                )?;
                if raw.trim().is_empty() {
                    default.to_string()
                } else {
                    raw
                }
            }
        };
        answers.insert(field.key.clone(), FormValue::Text(value));
    }
    Ok(answers)
}

fn event_for(event: &str, mut answers: FormAnswers) -> Result<WizardEvent, AppError> {
    let event = match event {
        "enter_code" => WizardEvent::EnterCode {
            // access codes compare verbatim, so skip the trimming `text()` applies
            code: match take(&mut answers, "code") {
                FormValue::Text(code) => code,
                FormValue::Integer(code) => code.to_string(),
            },
        },
        "confirm_intro" => WizardEvent::ConfirmIntro,
        "start_rounds" => WizardEvent::StartRounds,
        "submit_order" => WizardEvent::SubmitOrder {
            order: take(&mut answers, "order"),
        },
        "confirm_rounds" => WizardEvent::ConfirmRounds,
        "submit_warmup" => WizardEvent::SubmitWarmup { answers },
        "submit_survey" => WizardEvent::SubmitSurvey { answers },
        other => {
            return Err(StudyServiceError::Session(SessionError::State(format!(
                "screen submits unknown event '{other}'"
            )))
            .into())
        }
    };
    Ok(event)
}

fn take(answers: &mut FormAnswers, key: &str) -> FormValue {
    answers
        .remove(key)
        .unwrap_or_else(|| FormValue::Text(String::new()))
}
