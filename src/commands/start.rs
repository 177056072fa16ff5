use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use clap::Args;

use crate::descriptor::DEFAULT_PROFILE;
use crate::error::ExitError;
use crate::subprocess::Launcher;

#[derive(Debug, Args)]
pub struct StartArgs {
    /// App name (optional when the file declares a single app)
    pub app: Option<String>,
    /// Profile to launch with (default, production)
    #[arg(short = 'e', long = "env", default_value = DEFAULT_PROFILE)]
    pub profile: String,
    /// Descriptor file (or directory containing one)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Do not inherit the current environment
    #[arg(long)]
    pub clean: bool,
    /// Extra arguments for the script
    #[arg(last = true)]
    pub args: Vec<String>,
}

impl StartArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let registry = super::load_registry(self.config.as_deref())?;
        let desc = registry.select(self.app.as_deref())?;
        let base_env = super::base_environment(self.clean);
        let spec = desc.resolve(&self.profile, registry.base_dir(), &base_env)?;

        if spec.watch {
            tracing::warn!(
                app = %spec.app,
                "watch is a supervisor hint; warden start runs the process once"
            );
        }

        let stop = Arc::new(AtomicBool::new(false));
        let handler_flag = Arc::clone(&stop);
        if let Err(e) = ctrlc::set_handler(move || {
            handler_flag.store(true, Ordering::SeqCst);
        }) {
            tracing::warn!("could not install Ctrl-C handler: {e}");
        }

        let started_at = chrono::Local::now();
        eprintln!(
            "Starting {} ({}, {}) at {}",
            spec.app,
            spec.profile,
            if spec.dry_run { "dry run" } else { "live" },
            started_at.format("%Y-%m-%d %H:%M:%S")
        );

        let outcome = Launcher::new(&spec)
            .args(&self.args)
            .stop_flag(stop)
            .run()?;

        let runtime = chrono::Local::now() - started_at;
        tracing::info!(
            app = %spec.app,
            exit_code = outcome.exit_code,
            runtime_secs = runtime.num_seconds(),
            "process exited"
        );

        if outcome.interrupted {
            return Err(ExitError::Interrupted.into());
        }
        if outcome.success() {
            return Ok(());
        }

        let code = u8::try_from(outcome.exit_code)
            .ok()
            .filter(|c| *c != 0)
            .unwrap_or(1);
        Err(ExitError::new(
            code,
            format!("{} exited with status {}", spec.app, outcome.exit_code),
        )
        .into())
    }
}
