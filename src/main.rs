use std::process::ExitCode;

use clap::{Parser, Subcommand};

use warden::commands;
use warden::commands::init::InitArgs;
use warden::commands::list::ListArgs;
use warden::commands::resolve::ResolveArgs;
use warden::commands::start::StartArgs;
use warden::commands::validate::ValidateArgs;
use warden::error::{DescriptorError, ExitError};
use warden::telemetry;

#[derive(Debug, Parser)]
#[command(
    name = "warden",
    version,
    about = "Validate, resolve, and launch process descriptors"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// List declared apps and their profiles
    List(ListArgs),
    /// Print the launch spec for an app and profile
    Resolve(ResolveArgs),
    /// Check every app and profile in the descriptor file
    Validate(ValidateArgs),
    /// Launch an app once in the foreground
    Start(StartArgs),
    /// Write a starter ecosystem.toml
    Init(InitArgs),
    /// Print the JSON Schema for the descriptor file
    Schema,
}

impl Commands {
    const fn name(&self) -> &'static str {
        match self {
            Self::List(_) => "list",
            Self::Resolve(_) => "resolve",
            Self::Validate(_) => "validate",
            Self::Start(_) => "start",
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
        Commands::List(args) => args.execute(),
        Commands::Resolve(args) => args.execute(),
        Commands::Validate(args) => args.execute(),
        Commands::Start(args) => args.execute(),
        Commands::Init(args) => args.execute(),
        Commands::Schema => commands::schema::run_schema(),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            if let Some(exit_err) = e.downcast_ref::<ExitError>() {
                eprintln!("error: {exit_err}");
                exit_err.exit_code()
            } else if let Some(desc_err) = e.downcast_ref::<DescriptorError>() {
                eprintln!("error: {desc_err}");
                desc_err.exit_code()
            } else {
                eprintln!("error: {e:#}");
                ExitCode::FAILURE
            }
        }
    }
}
