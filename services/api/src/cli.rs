use crate::demo::{run_demo, DemoArgs};
use crate::server;
use crate::terminal::{run_terminal, RunArgs};
use clap::{Args, Parser, Subcommand};
use newsvendor_lab::error::AppError;

#[derive(Parser, Debug)]
#[command(
    name = "Newsvendor Lab",
    about = "Run the newsvendor ordering experiment as a web service or in the terminal",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Start the HTTP service (default command)
    Serve(ServeArgs),
    /// Walk one participant through the study on this terminal
    Run(RunArgs),
    /// Play a scripted participant and print the per-round results
    Demo(DemoArgs),
}

#[derive(Args, Debug, Default)]
pub(crate) struct ServeArgs {
    /// Override the configured host for the HTTP server
    #[arg(long)]
    pub(crate) host: Option<String>,
    /// Override the configured port for the HTTP server
    #[arg(long)]
    pub(crate) port: Option<u16>,
}

pub(crate) async fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    let command = cli
        .command
        .unwrap_or_else(|| Command::Serve(ServeArgs::default()));

    match command {
        Command::Serve(args) => server::run(args).await,
        Command::Run(args) => run_terminal(args).await,
        Command::Demo(args) => run_demo(args).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bare_invocation_serves() {
        let cli = Cli::try_parse_from(["newsvendor-lab-api"]).expect("parses");
        assert!(cli.command.is_none());
    }

    #[test]
    fn demo_accepts_comma_separated_orders() {
        let cli = Cli::try_parse_from([
            "newsvendor-lab-api",
            "demo",
            "--orders",
            "100,90,110",
            "--output",
            "out.csv",
        ])
        .expect("parses");
        match cli.command {
            Some(Command::Demo(args)) => {
                assert_eq!(args.orders.0, vec![100, 90, 110]);
                assert_eq!(args.output.as_deref(), Some(std::path::Path::new("out.csv")));
            }
            other => panic!("expected demo command, got {other:?}"),
        }
    }

    #[test]
    fn run_takes_group_and_seed() {
        let cli = Cli::try_parse_from(["newsvendor-lab-api", "run", "--group", "2", "--seed", "9"])
            .expect("parses");
        match cli.command {
            Some(Command::Run(args)) => {
                assert_eq!(args.group.as_deref(), Some("2"));
                assert_eq!(args.seed, Some(9));
            }
            other => panic!("expected run command, got {other:?}"),
        }
    }

    #[test]
    fn demo_rejects_non_numeric_orders() {
        assert!(Cli::try_parse_from(["newsvendor-lab-api", "demo", "--orders", "a,b"]).is_err());
    }
}
