//! Child process execution.
//!
//! Every process a source spawns (the program itself, `java -jar`, the `aws`
//! transfer tool) goes through an [`ExecContext`]. The context carries the
//! working directory and environment overrides of one manifest entry and
//! applies them to the child only; the parent process is never mutated.

use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::ffi::OsStr;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

/// Working directory and environment applied to child processes.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecContext {
    cwd: Option<PathBuf>,
    env: BTreeMap<String, String>,
}

impl ExecContext {
    /// A context that inherits everything from the current process.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the working directory for children.
    #[must_use]
    pub fn with_cwd(mut self, cwd: impl Into<PathBuf>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    /// Add an environment variable, merged over the inherited environment.
    #[must_use]
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Add several environment variables.
    #[must_use]
    pub fn with_envs<I, K, V>(mut self, vars: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        self.env
            .extend(vars.into_iter().map(|(k, v)| (k.into(), v.into())));
        self
    }

    /// Working directory override.
    pub fn cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    /// Environment overrides.
    pub fn env(&self) -> &BTreeMap<String, String> {
        &self.env
    }

    /// Look up a variable: overrides first, then the inherited environment.
    pub fn var(&self, key: &str) -> Option<String> {
        self.env
            .get(key)
            .cloned()
            .or_else(|| std::env::var(key).ok())
    }

    /// Resolve `path` against the working directory of this context.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            return path.to_path_buf();
        }
        match &self.cwd {
            Some(cwd) => cwd.join(path),
            None => std::env::current_dir().map_or_else(|_| path.to_path_buf(), |d| d.join(path)),
        }
    }

    /// A command with this context applied and stdio inherited.
    pub fn command(&self, program: impl AsRef<OsStr>) -> Command {
        let mut cmd = Command::new(program);
        cmd.envs(&self.env)
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit());
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }

    /// Run `program` with `args` and wait for it.
    ///
    /// A non-zero exit is [`Error::RunFailed`].
    pub fn run<S: AsRef<OsStr>>(&self, program: impl AsRef<OsStr>, args: &[S]) -> Result<()> {
        let program = program.as_ref();
        let display = program.to_string_lossy().into_owned();
        log::info!("Running {display}");
        let status = self
            .command(program)
            .args(args)
            .status()
            .map_err(|e| Error::io(&display, e))?;
        log::debug!("{display} exited with {status}");
        if status.success() {
            Ok(())
        } else {
            Err(Error::RunFailed {
                program: display,
                status: status.code(),
            })
        }
    }
}

/// Locate a tool on `PATH`.
pub fn find_tool(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Whether any execute bit is set on `path`.
#[cfg(unix)]
pub fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path).is_ok_and(|m| m.is_file() && m.permissions().mode() & 0o111 != 0)
}

/// Whether `path` is a file.
#[cfg(not(unix))]
pub fn is_executable(path: &Path) -> bool {
    path.is_file()
}

/// Mark `path` readable and executable by everyone.
#[cfg(unix)]
pub fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    let mut perms = std::fs::metadata(path)
        .map_err(|e| Error::io(path, e))?
        .permissions();
    perms.set_mode(perms.mode() | 0o555);
    std::fs::set_permissions(path, perms).map_err(|e| Error::io(path, e))
}

/// No-op where execute bits do not exist.
#[cfg(not(unix))]
pub fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_relative_against_cwd() {
        let ctx = ExecContext::new().with_cwd("/srv/app");
        assert_eq!(ctx.resolve(Path::new("conf")), PathBuf::from("/srv/app/conf"));
        assert_eq!(ctx.resolve(Path::new("/etc/x")), PathBuf::from("/etc/x"));
    }

    #[test]
    fn test_var_prefers_overrides() {
        let ctx = ExecContext::new().with_env("ARX_TEST_VAR_PREFERS", "inner");
        assert_eq!(ctx.var("ARX_TEST_VAR_PREFERS").as_deref(), Some("inner"));
        assert_eq!(ctx.var("ARX_TEST_VAR_SURELY_UNSET"), None);
    }

    #[test]
    fn test_with_envs_merges() {
        let ctx = ExecContext::new()
            .with_env("A", "1")
            .with_envs([("B", "2"), ("A", "3")]);
        assert_eq!(ctx.env().get("A").map(String::as_str), Some("3"));
        assert_eq!(ctx.env().get("B").map(String::as_str), Some("2"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_applies_env_and_cwd_to_child_only() {
        let temp = TempDir::new().unwrap();
        let out = temp.path().join("out");
        let ctx = ExecContext::new()
            .with_cwd(temp.path())
            .with_env("ARX_CHILD_ONLY", "yes");
        ctx.run("sh", &["-c", "echo \"$ARX_CHILD_ONLY $(pwd)\" > out"])
            .unwrap();

        let written = std::fs::read_to_string(&out).unwrap();
        assert!(written.starts_with("yes "));
        assert!(std::env::var("ARX_CHILD_ONLY").is_err());
        assert_ne!(std::env::current_dir().unwrap(), temp.path());
    }

    #[cfg(unix)]
    #[test]
    fn test_run_nonzero_is_run_failed() {
        let err = ExecContext::new().run("sh", &["-c", "exit 3"]).unwrap_err();
        assert!(matches!(err, Error::RunFailed { status: Some(3), .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_make_executable() {
        let temp = TempDir::new().unwrap();
        let script = temp.path().join("s");
        std::fs::write(&script, "#!/bin/sh\n").unwrap();
        assert!(!is_executable(&script));
        make_executable(&script).unwrap();
        assert!(is_executable(&script));
    }
}
