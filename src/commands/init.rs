use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use crate::config::{CONFIG_TOML, EcosystemConfig};
use crate::error::ExitError;
use crate::registry::Registry;

#[derive(Debug, Args)]
pub struct InitArgs {
    /// Directory to write ecosystem.toml into
    #[arg(long)]
    pub dir: Option<PathBuf>,
    /// Convert an existing JSON descriptor instead of writing the starter
    #[arg(long)]
    pub from: Option<PathBuf>,
    /// Overwrite an existing ecosystem.toml
    #[arg(long)]
    pub force: bool,
}

impl InitArgs {
    pub fn execute(&self) -> Result<()> {
        let dir = match &self.dir {
            Some(dir) => dir.clone(),
            None => std::env::current_dir().context("could not determine current directory")?,
        };
        let target = dir.join(CONFIG_TOML);

        if target.exists() && !self.force {
            return Err(ExitError::Other(format!(
                "{} already exists; pass --force to overwrite",
                target.display()
            ))
            .into());
        }

        let config = match &self.from {
            Some(source) => load_json(source)?,
            None => EcosystemConfig::starter(),
        };
        // Reject descriptors that parse but would fail at launch (missing DRY_RUN, duplicates).
        Registry::from_config(&config, &dir)?;

        fs::create_dir_all(&dir).with_context(|| format!("creating {}", dir.display()))?;
        fs::write(&target, config.to_toml()?)
            .with_context(|| format!("writing {}", target.display()))?;

        tracing::info!(path = %target.display(), apps = config.apps.len(), "wrote descriptor file");
        println!("Wrote {}", target.display());
        Ok(())
    }
}

fn load_json(source: &Path) -> Result<EcosystemConfig> {
    let json = fs::read_to_string(source).with_context(|| format!("reading {}", source.display()))?;
    Ok(EcosystemConfig::parse_json(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_starter_and_refuses_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        let args = InitArgs {
            dir: Some(dir.path().to_path_buf()),
            from: None,
            force: false,
        };
        args.execute().unwrap();

        let written = EcosystemConfig::load(&dir.path().join(CONFIG_TOML)).unwrap();
        assert_eq!(written, EcosystemConfig::starter());

        let err = args.execute().unwrap_err();
        assert!(err.to_string().contains("--force"));
    }

    #[test]
    fn converts_json_source() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("ecosystem.json");
        let mut config = EcosystemConfig::starter();
        config.apps[0].name = "inbox-watcher".into();
        fs::write(&source, serde_json::to_string(&config).unwrap()).unwrap();

        InitArgs {
            dir: Some(dir.path().to_path_buf()),
            from: Some(source),
            force: false,
        }
        .execute()
        .unwrap();

        let written = EcosystemConfig::load(&dir.path().join(CONFIG_TOML)).unwrap();
        assert_eq!(written.apps[0].name, "inbox-watcher");
    }

    #[test]
    fn rejects_json_without_dry_run() {
        let dir = tempfile::tempdir().unwrap();
        let source = dir.path().join("ecosystem.json");
        fs::write(
            &source,
            r#"{"apps": [{"name": "w", "script": "w.py", "interpreter": "python",
                "env": {"NODE_ENV": "development"}}]}"#,
        )
        .unwrap();

        let err = InitArgs {
            dir: Some(dir.path().to_path_buf()),
            from: Some(source),
            force: false,
        }
        .execute()
        .unwrap_err();
        assert!(err.to_string().contains("missing DRY_RUN"), "got: {err}");
        assert!(!dir.path().join(CONFIG_TOML).exists());
    }
}
