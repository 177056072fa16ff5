//! Validated process descriptors and profile resolution.

mod launch;
mod profile;

use std::collections::BTreeMap;
use std::path::PathBuf;

pub use launch::{LaunchSpec, os_environment};
pub use profile::{
    DEFAULT_PROFILE, DRY_RUN, NODE_ENV, PRODUCTION_PROFILE, Profile, parse_dry_run, profile_key,
};

use crate::config::AppConfig;
use crate::error::DescriptorError;

/// How to launch one managed process.
///
/// Built once from the descriptor file and never mutated. Profiles are keyed by
/// profile name (`default`, `production`), not by file key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessDescriptor {
    pub name: String,
    pub entry_point: PathBuf,
    pub interpreter: String,
    /// As written; relative paths are resolved against the descriptor file's directory.
    pub working_dir: PathBuf,
    pub watch: bool,
    profiles: BTreeMap<String, Profile>,
}

impl ProcessDescriptor {
    /// Validate one app entry from the descriptor file.
    pub fn from_config(app: &AppConfig) -> Result<Self, DescriptorError> {
        let name = app.name.trim();
        if name.is_empty() || name != app.name {
            return Err(DescriptorError::malformed(format!(
                "app name {:?} must be non-empty without surrounding whitespace",
                app.name
            )));
        }
        if app.script.as_os_str().is_empty() {
            return Err(DescriptorError::malformed(format!("app {name:?}: script is empty")));
        }
        if app.interpreter.trim().is_empty() {
            return Err(DescriptorError::malformed(format!(
                "app {name:?}: interpreter is empty"
            )));
        }

        let mut profiles = BTreeMap::new();
        profiles.insert(
            DEFAULT_PROFILE.to_string(),
            Profile::from_table(name, DEFAULT_PROFILE, &app.env)?,
        );
        if let Some(table) = &app.env_production {
            profiles.insert(
                PRODUCTION_PROFILE.to_string(),
                Profile::from_table(name, PRODUCTION_PROFILE, table)?,
            );
        }

        Ok(Self {
            name: app.name.clone(),
            entry_point: app.script.clone(),
            interpreter: app.interpreter.clone(),
            working_dir: app.cwd.clone(),
            watch: app.watch,
            profiles,
        })
    }

    /// Look up a declared profile.
    pub fn profile(&self, name: &str) -> Result<&Profile, DescriptorError> {
        self.profiles
            .get(name)
            .ok_or_else(|| DescriptorError::UnknownProfile {
                app: self.name.clone(),
                profile: name.to_string(),
                declared: self.profile_names().into_iter().map(String::from).collect(),
            })
    }

    /// Declared profile names, sorted.
    pub fn profile_names(&self) -> Vec<&str> {
        self.profiles.keys().map(String::as_str).collect()
    }

    pub fn profiles(&self) -> impl Iterator<Item = (&str, &Profile)> {
        self.profiles.iter().map(|(k, v)| (k.as_str(), v))
    }
}
