use std::collections::BTreeMap;
use std::path::PathBuf;

use clap::Args;

use super::validate::OutputFormat;
use crate::descriptor::{DEFAULT_PROFILE, LaunchSpec};

#[derive(Debug, Args)]
pub struct ResolveArgs {
    /// App name (optional when the file declares a single app)
    pub app: Option<String>,
    /// Profile to resolve (default, production)
    #[arg(short = 'e', long = "env", default_value = DEFAULT_PROFILE)]
    pub profile: String,
    /// Descriptor file (or directory containing one)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Do not inherit the current environment
    #[arg(long)]
    pub clean: bool,
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

impl ResolveArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let registry = super::load_registry(self.config.as_deref())?;
        let desc = registry.select(self.app.as_deref())?;
        let base_env = super::base_environment(self.clean);
        let spec = desc.resolve(&self.profile, registry.base_dir(), &base_env)?;

        match OutputFormat::or_detect(self.format) {
            OutputFormat::Pretty => print_pretty(&spec, &base_env),
            OutputFormat::Text => print_text(&spec),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&spec)?),
        }
        Ok(())
    }
}

fn print_pretty(spec: &LaunchSpec, base_env: &BTreeMap<String, String>) {
    println!("{} ({})", spec.app, spec.profile);
    println!("  command: {}", spec.command_line());
    println!("  cwd:     {}", spec.cwd.display());
    println!("  watch:   {}", if spec.watch { "yes (supervisor hint)" } else { "no" });
    println!("  dry run: {}", if spec.dry_run { "enabled" } else { "disabled" });

    let overrides: Vec<_> = spec.overrides(base_env).collect();
    if !overrides.is_empty() {
        println!("\nProfile environment:");
        for (key, value) in &overrides {
            println!("  {key}={value}");
        }
    }
    let inherited = spec.env.len() - overrides.len();
    if inherited > 0 {
        println!("\n{inherited} inherited variable(s)");
    }
}

fn print_text(spec: &LaunchSpec) {
    println!(
        "launch  app={}  profile={}  interpreter={}  script={}  cwd={}  watch={}  dry_run={}",
        spec.app,
        spec.profile,
        spec.interpreter,
        spec.script.display(),
        spec.cwd.display(),
        spec.watch,
        spec.dry_run
    );
    for (key, value) in &spec.env {
        println!("env  {key}={value}");
    }
}
