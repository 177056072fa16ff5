use std::process::{Command, ExitStatus, Stdio};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use anyhow::Context;

use crate::descriptor::LaunchSpec;
use crate::error::ExitError;

const DEFAULT_POLL: Duration = Duration::from_millis(50);

/// How a launched process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub exit_code: i32,
    /// True when the stop flag was raised and the child was killed.
    pub interrupted: bool,
}

impl RunOutcome {
    /// Returns true if the process exited successfully on its own.
    pub const fn success(&self) -> bool {
        self.exit_code == 0 && !self.interrupted
    }
}

/// Spawns one process instance from a resolved launch spec.
///
/// The child gets exactly the resolved environment. There is no restart
/// logic: when the child exits, `run` returns.
pub struct Launcher<'a> {
    spec: &'a LaunchSpec,
    args: Vec<String>,
    poll: Duration,
    stop: Option<Arc<AtomicBool>>,
    capture: bool,
}

impl<'a> Launcher<'a> {
    pub fn new(spec: &'a LaunchSpec) -> Self {
        Self {
            spec,
            args: Vec::new(),
            poll: DEFAULT_POLL,
            stop: None,
            capture: false,
        }
    }

    /// Extra arguments passed after the script path.
    pub fn args(mut self, args: &[String]) -> Self {
        self.args.extend(args.iter().cloned());
        self
    }

    /// Kill the child once this flag becomes true.
    pub fn stop_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.stop = Some(flag);
        self
    }

    pub fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll = interval;
        self
    }

    /// Discard the child's stdout and stderr instead of inheriting them.
    pub fn quiet(mut self) -> Self {
        self.capture = true;
        self
    }

    fn command(&self) -> Command {
        let mut cmd = Command::new(&self.spec.interpreter);
        cmd.arg(&self.spec.script)
            .args(&self.args)
            .current_dir(&self.spec.cwd)
            .env_clear()
            .envs(&self.spec.env)
            .stdin(Stdio::null());
        if self.capture {
            cmd.stdout(Stdio::null()).stderr(Stdio::null());
        }
        cmd
    }

    /// Spawn the process and wait for it to exit or for the stop flag.
    pub fn run(&self) -> anyhow::Result<RunOutcome> {
        let mut child = self.command().spawn().map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                anyhow::Error::from(ExitError::InterpreterNotFound {
                    interpreter: self.spec.interpreter.clone(),
                })
            } else {
                anyhow::Error::new(e).context(format!("spawning {}", self.spec.command_line()))
            }
        })?;

        tracing::info!(
            app = %self.spec.app,
            profile = %self.spec.profile,
            pid = child.id(),
            dry_run = self.spec.dry_run,
            "process started"
        );

        loop {
            match child.try_wait() {
                Ok(Some(status)) => {
                    return Ok(RunOutcome {
                        exit_code: exit_code(status),
                        interrupted: false,
                    });
                }
                Ok(None) => {
                    if self.stop.as_ref().is_some_and(|f| f.load(Ordering::SeqCst)) {
                        tracing::warn!(app = %self.spec.app, "stop requested, killing process");
                        let _ = child.kill();
                        let status = child
                            .wait()
                            .with_context(|| format!("reaping {}", self.spec.app))?;
                        return Ok(RunOutcome {
                            exit_code: exit_code(status),
                            interrupted: true,
                        });
                    }
                    std::thread::sleep(self.poll);
                }
                Err(e) => {
                    return Err(
                        anyhow::Error::new(e).context(format!("waiting for {}", self.spec.app))
                    );
                }
            }
        }
    }
}

fn exit_code(status: ExitStatus) -> i32 {
    status.code().unwrap_or(-1)
}

/// First line printed by `<program> --version`, or None if it cannot run.
///
/// Some interpreters (python2) print the version on stderr, so both streams are checked.
pub fn interpreter_version(program: &str) -> Option<String> {
    let output = Command::new(program)
        .arg("--version")
        .stdin(Stdio::null())
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    [&output.stdout, &output.stderr]
        .into_iter()
        .map(|bytes| String::from_utf8_lossy(bytes).trim().to_string())
        .find(|s| !s.is_empty())
        .and_then(|s| s.lines().next().map(str::to_string))
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::path::Path;

    use super::*;

    fn spec_for(dir: &Path, script: &str, body: &str, dry_run: bool) -> LaunchSpec {
        std::fs::write(dir.join(script), body).unwrap();
        let mut env = BTreeMap::from([
            ("NODE_ENV".to_string(), "development".to_string()),
            ("DRY_RUN".to_string(), dry_run.to_string()),
        ]);
        if let Ok(path) = std::env::var("PATH") {
            env.insert("PATH".to_string(), path);
        }
        LaunchSpec {
            app: "probe".into(),
            profile: "default".into(),
            interpreter: "sh".into(),
            script: dir.join(script),
            cwd: dir.to_path_buf(),
            watch: false,
            dry_run,
            env,
        }
    }

    #[test]
    fn child_sees_resolved_environment() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_for(
            dir.path(),
            "probe.sh",
            "printf '%s %s' \"$NODE_ENV\" \"$DRY_RUN\" > out.txt\n",
            true,
        );
        let outcome = Launcher::new(&spec).quiet().run().unwrap();
        assert!(outcome.success());
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "development true");
    }

    #[test]
    fn parent_only_variables_are_not_leaked() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_for(
            dir.path(),
            "probe.sh",
            "printf '%s' \"${HOME:-unset}\" > out.txt\n",
            false,
        );
        Launcher::new(&spec).quiet().run().unwrap();
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "unset");
    }

    #[test]
    fn extra_args_follow_script() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_for(dir.path(), "probe.sh", "printf '%s' \"$1\" > out.txt\n", true);
        Launcher::new(&spec)
            .args(&["--once".to_string()])
            .quiet()
            .run()
            .unwrap();
        let written = std::fs::read_to_string(dir.path().join("out.txt")).unwrap();
        assert_eq!(written, "--once");
    }

    #[test]
    fn exit_code_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_for(dir.path(), "fail.sh", "exit 3\n", true);
        let outcome = Launcher::new(&spec).quiet().run().unwrap();
        assert_eq!(outcome.exit_code, 3);
        assert!(!outcome.success());
    }

    #[test]
    fn stop_flag_kills_child() {
        let dir = tempfile::tempdir().unwrap();
        let spec = spec_for(dir.path(), "sleep.sh", "sleep 30\n", true);
        let flag = Arc::new(AtomicBool::new(true));
        let outcome = Launcher::new(&spec)
            .stop_flag(flag)
            .poll_interval(Duration::from_millis(10))
            .quiet()
            .run()
            .unwrap();
        assert!(outcome.interrupted);
        assert!(!outcome.success());
    }

    #[test]
    fn interpreter_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let mut spec = spec_for(dir.path(), "probe.sh", "true\n", true);
        spec.interpreter = "nonexistent-interpreter-xyz".into();
        let err = Launcher::new(&spec).run().unwrap_err();
        let exit_err = err.downcast_ref::<ExitError>().unwrap();
        assert!(matches!(exit_err, ExitError::InterpreterNotFound { .. }));
    }

    #[test]
    fn version_of_missing_program() {
        assert!(interpreter_version("nonexistent-interpreter-xyz").is_none());
    }
}
