use std::process::ExitCode;

use clap::{Parser, Subcommand};

use label_worker::commands::{self, init::InitArgs, run::RunArgs};
use label_worker::{error, telemetry};

#[derive(Debug, Parser)]
#[command(
    name = "label-worker",
    version,
    about = "Poll GitHub labels and run coding-agent tasks for issues and pull requests"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Poll for labelled items and run the agent on each
    Run(RunArgs),
    /// Create the labels the workers use
    Init(InitArgs),
    /// Print the JSON Schema for .label-worker.toml
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::Run(_) => "run",
            Self::Init(_) => "init",
            Self::Schema => "schema",
        }
    }
}

fn main() -> ExitCode {
    telemetry::init();

    let cli = Cli::parse();

    let _span = tracing::info_span!("command", name = cli.command.name()).entered();

    let result = match cli.command {
        Commands::Run(args) => args.execute(),
        Commands::Init(args) => args.execute(),
        Commands::Schema => commands::schema::run_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<error::ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
