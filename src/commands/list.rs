use std::path::PathBuf;

use clap::Args;
use serde::Serialize;

use super::validate::OutputFormat;
use crate::registry::Registry;

#[derive(Debug, Args)]
pub struct ListArgs {
    /// Descriptor file (or directory containing one)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Serialize)]
pub struct AppSummary {
    pub name: String,
    pub interpreter: String,
    pub script: PathBuf,
    pub cwd: PathBuf,
    pub watch: bool,
    pub profiles: Vec<String>,
}

fn summarize(registry: &Registry) -> Vec<AppSummary> {
    registry
        .iter()
        .map(|desc| AppSummary {
            name: desc.name.clone(),
            interpreter: desc.interpreter.clone(),
            script: desc.entry_point.clone(),
            cwd: desc.working_dir.clone(),
            watch: desc.watch,
            profiles: desc.profile_names().into_iter().map(String::from).collect(),
        })
        .collect()
}

impl ListArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let registry = super::load_registry(self.config.as_deref())?;
        let apps = summarize(&registry);

        match OutputFormat::or_detect(self.format) {
            OutputFormat::Pretty => {
                println!("Apps ({}) in {}:", apps.len(), registry.base_dir().display());
                for app in &apps {
                    println!("  {}", app.name);
                    println!("    {} {}", app.interpreter, app.script.display());
                    println!("    cwd: {}  watch: {}", app.cwd.display(), app.watch);
                    println!("    profiles: {}", app.profiles.join(", "));
                }
            }
            OutputFormat::Text => {
                for app in &apps {
                    println!(
                        "app  {}  interpreter={}  script={}  cwd={}  watch={}  profiles={}",
                        app.name,
                        app.interpreter,
                        app.script.display(),
                        app.cwd.display(),
                        app.watch,
                        app.profiles.join(",")
                    );
                }
            }
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&apps)?),
        }
        Ok(())
    }
}
