use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};

use anyhow::Context;

use crate::config::EcosystemConfig;
use crate::descriptor::{LaunchSpec, ProcessDescriptor};
use crate::error::DescriptorError;

/// The set of managed processes declared by one descriptor file.
///
/// Owned by whoever loads it and passed to the code that needs it; there is no
/// process-wide app table.
#[derive(Debug, Clone)]
pub struct Registry {
    apps: Vec<ProcessDescriptor>,
    base_dir: PathBuf,
}

impl Registry {
    /// Validate every app. Relative working directories resolve against `base_dir`.
    pub fn from_config(config: &EcosystemConfig, base_dir: &Path) -> Result<Self, DescriptorError> {
        if config.apps.is_empty() {
            return Err(DescriptorError::malformed("no apps declared"));
        }

        let mut seen = HashSet::new();
        let mut apps = Vec::with_capacity(config.apps.len());
        for app in &config.apps {
            if !seen.insert(app.name.as_str()) {
                return Err(DescriptorError::malformed(format!(
                    "duplicate app name {:?}",
                    app.name
                )));
            }
            apps.push(ProcessDescriptor::from_config(app)?);
        }

        Ok(Self {
            apps,
            base_dir: base_dir.to_path_buf(),
        })
    }

    /// Load a descriptor file and build the registry next to it.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let path = std::path::absolute(path)
            .with_context(|| format!("resolving {}", path.display()))?;
        let config = EcosystemConfig::load(&path)?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("/"));
        tracing::debug!(path = %path.display(), apps = config.apps.len(), "loaded descriptor file");
        Ok(Self::from_config(&config, base_dir)?)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn iter(&self) -> impl Iterator<Item = &ProcessDescriptor> {
        self.apps.iter()
    }

    pub fn len(&self) -> usize {
        self.apps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.apps.is_empty()
    }

    pub fn names(&self) -> Vec<String> {
        self.apps.iter().map(|a| a.name.clone()).collect()
    }

    pub fn get(&self, name: &str) -> Result<&ProcessDescriptor, DescriptorError> {
        self.apps
            .iter()
            .find(|a| a.name == name)
            .ok_or_else(|| DescriptorError::UnknownApp {
                name: name.to_string(),
                declared: self.names(),
            })
    }

    /// The named app, or the only app when `name` is omitted.
    pub fn select(&self, name: Option<&str>) -> Result<&ProcessDescriptor, DescriptorError> {
        match name {
            Some(name) => self.get(name),
            None => self.sole().ok_or_else(|| DescriptorError::AmbiguousApp {
                declared: self.names(),
            }),
        }
    }

    /// The only declared app, if there is exactly one.
    pub fn sole(&self) -> Option<&ProcessDescriptor> {
        match self.apps.as_slice() {
            [only] => Some(only),
            _ => None,
        }
    }

    pub fn resolve(
        &self,
        app: &str,
        profile: &str,
        base_env: &BTreeMap<String, String>,
    ) -> Result<LaunchSpec, DescriptorError> {
        self.get(app)?.resolve(profile, &self.base_dir, base_env)
    }
}
