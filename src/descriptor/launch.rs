use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};

use serde::Serialize;

use super::ProcessDescriptor;
use crate::error::DescriptorError;

/// Everything a supervisor needs to spawn one process instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LaunchSpec {
    pub app: String,
    pub profile: String,
    pub interpreter: String,
    pub script: PathBuf,
    pub cwd: PathBuf,
    /// Restart-on-change hint; acting on it is the supervisor's job.
    pub watch: bool,
    pub dry_run: bool,
    /// Base environment with the profile's variables on top.
    pub env: BTreeMap<String, String>,
}

impl LaunchSpec {
    /// `interpreter script` for display.
    pub fn command_line(&self) -> String {
        format!("{} {}", self.interpreter, self.script.display())
    }

    /// Variables whose value differs from `base_env` (or that it lacks).
    pub fn overrides<'a>(
        &'a self,
        base_env: &'a BTreeMap<String, String>,
    ) -> impl Iterator<Item = (&'a str, &'a str)> + 'a {
        self.env
            .iter()
            .filter(move |(k, v)| base_env.get(*k) != Some(*v))
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl ProcessDescriptor {
    /// Resolve `profile` into a launch spec.
    ///
    /// `base_dir` is the directory of the descriptor file; `base_env` is the
    /// environment the process would inherit. Nothing is mutated, so repeated
    /// calls with the same inputs return the same spec.
    pub fn resolve(
        &self,
        profile: &str,
        base_dir: &Path,
        base_env: &BTreeMap<String, String>,
    ) -> Result<LaunchSpec, DescriptorError> {
        let selected = self.profile(profile)?;

        let cwd = normalize(&base_dir.join(expand_home(&self.working_dir)));
        let script = normalize(&cwd.join(&self.entry_point));
        if !script.is_file() {
            return Err(DescriptorError::MissingEntryPoint {
                app: self.name.clone(),
                path: script,
            });
        }

        let mut env = base_env.clone();
        env.extend(selected.to_env());

        tracing::debug!(
            app = %self.name,
            profile,
            script = %script.display(),
            dry_run = selected.dry_run,
            "resolved launch spec"
        );

        Ok(LaunchSpec {
            app: self.name.clone(),
            profile: profile.to_string(),
            interpreter: self.interpreter.clone(),
            script,
            cwd,
            watch: self.watch,
            dry_run: selected.dry_run,
            env,
        })
    }
}

/// Snapshot of the current process environment. Non-UTF-8 entries are skipped.
pub fn os_environment() -> BTreeMap<String, String> {
    std::env::vars_os()
        .filter_map(|(k, v)| Some((k.into_string().ok()?, v.into_string().ok()?)))
        .collect()
}

fn expand_home(path: &Path) -> PathBuf {
    if let Ok(rest) = path.strip_prefix("~")
        && let Some(home) = dirs::home_dir()
    {
        return home.join(rest);
    }
    path.to_path_buf()
}

/// Drop `.` components so `./` working directories display cleanly.
fn normalize(path: &Path) -> PathBuf {
    let cleaned: PathBuf = path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();
    if cleaned.as_os_str().is_empty() {
        PathBuf::from(".")
    } else {
        cleaned
    }
}
