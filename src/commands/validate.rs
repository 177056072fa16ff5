use std::io::IsTerminal;
use std::path::PathBuf;

use clap::Args;
use serde::{Deserialize, Serialize};

use crate::config;
use crate::descriptor::ProcessDescriptor;
use crate::registry::Registry;
use crate::subprocess::interpreter_version;

const KNOWN_NODE_ENVS: &[&str] = &["development", "production"];

#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Descriptor file (or directory containing one)
    #[arg(long)]
    pub config: Option<PathBuf>,
    /// Strict mode: also require interpreters on PATH and standard NODE_ENV values
    #[arg(long)]
    pub strict: bool,
    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<OutputFormat>,
}

#[derive(Debug, Clone, Copy, clap::ValueEnum)]
pub enum OutputFormat {
    Pretty,
    Text,
    Json,
}

impl OutputFormat {
    /// Pretty on a terminal, text when piped.
    pub fn or_detect(format: Option<Self>) -> Self {
        format.unwrap_or_else(|| {
            if std::io::stdout().is_terminal() {
                Self::Pretty
            } else {
                Self::Text
            }
        })
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ValidateReport {
    pub config: String,
    pub apps: Vec<AppStatus>,
    pub issues: Vec<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AppStatus {
    pub name: String,
    pub interpreter: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interpreter_version: Option<String>,
    pub profiles: Vec<ProfileStatus>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ProfileStatus {
    pub name: String,
    pub node_env: String,
    pub dry_run: bool,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ValidateArgs {
    pub fn execute(&self) -> anyhow::Result<()> {
        let path = config::locate(self.config.as_deref())?;
        let registry = Registry::load(&path)?;
        let format = OutputFormat::or_detect(self.format);

        let mut report = ValidateReport {
            config: path.display().to_string(),
            apps: vec![],
            issues: vec![],
        };

        for desc in registry.iter() {
            let status = self.check_app(&registry, desc, &mut report.issues);
            report.apps.push(status);
        }

        let issue_count = report.issues.len();

        match format {
            OutputFormat::Pretty => print_pretty(&report),
            OutputFormat::Text => print_text(&report),
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        }

        if issue_count > 0 {
            return Err(crate::error::ExitError::new(
                u8::try_from(issue_count.min(125)).unwrap_or(125),
                format!("{issue_count} issue(s) found"),
            )
            .into());
        }

        Ok(())
    }

    fn check_app(
        &self,
        registry: &Registry,
        desc: &ProcessDescriptor,
        issues: &mut Vec<String>,
    ) -> AppStatus {
        let mut status = AppStatus {
            name: desc.name.clone(),
            interpreter: desc.interpreter.clone(),
            interpreter_version: None,
            profiles: vec![],
        };

        // An empty base environment keeps the check independent of the caller's shell.
        let base_env = std::collections::BTreeMap::new();
        for (name, profile) in desc.profiles() {
            let error = desc
                .resolve(name, registry.base_dir(), &base_env)
                .err()
                .map(|e| e.to_string());
            if let Some(ref e) = error {
                issues.push(e.clone());
            }
            if self.strict && !KNOWN_NODE_ENVS.contains(&profile.node_env.as_str()) {
                issues.push(format!(
                    "app {:?}, profile {name:?}: non-standard NODE_ENV {:?}",
                    desc.name, profile.node_env
                ));
            }
            status.profiles.push(ProfileStatus {
                name: name.to_string(),
                node_env: profile.node_env.clone(),
                dry_run: profile.dry_run,
                ok: error.is_none(),
                error,
            });
        }

        if self.strict {
            status.interpreter_version = interpreter_version(&desc.interpreter);
            if status.interpreter_version.is_none() {
                issues.push(format!(
                    "app {:?}: interpreter not found: {}",
                    desc.name, desc.interpreter
                ));
            }
        }

        status
    }
}

fn print_pretty(report: &ValidateReport) {
    println!("=== Warden Validate ===\n");
    println!("Config: {}", report.config);
    println!();

    for app in &report.apps {
        match &app.interpreter_version {
            Some(version) => println!("{} ({}: {version})", app.name, app.interpreter),
            None => println!("{} ({})", app.name, app.interpreter),
        }
        for profile in &app.profiles {
            let mode = if profile.dry_run { "dry run" } else { "live" };
            if profile.ok {
                println!("  ✓ {}: NODE_ENV={}, {mode}", profile.name, profile.node_env);
            } else {
                println!(
                    "  ✗ {}: {}",
                    profile.name,
                    profile.error.as_deref().unwrap_or("failed")
                );
            }
        }
    }

    if report.issues.is_empty() {
        println!("\n✓ No issues found");
    } else {
        println!("\nIssues ({}):", report.issues.len());
        for issue in &report.issues {
            println!("  • {issue}");
        }
    }
}

fn print_text(report: &ValidateReport) {
    println!("warden-validate  config={}  apps={}", report.config, report.apps.len());

    for app in &report.apps {
        for profile in &app.profiles {
            let status = if profile.ok { "ok" } else { "error" };
            println!(
                "profile  {}  {}  {status}  node_env={}  dry_run={}",
                app.name, profile.name, profile.node_env, profile.dry_run
            );
        }
    }

    if !report.issues.is_empty() {
        println!("issues  count={}", report.issues.len());
        for issue in &report.issues {
            println!("issue  {issue}");
        }
    }
}
