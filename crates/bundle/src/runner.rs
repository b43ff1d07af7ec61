//! Sequential, fail-fast task execution.
//!
//! Entries run one at a time: every data entry in manifest order, then every
//! code entry in manifest order. Each entry gets its own [`CacheDir`], which
//! is removed when the entry finishes whether or not it succeeded. The first
//! failure stops the run.
//!
//! An entry's `cwd` and `env` (layered over the task's) are applied only to
//! the child processes it spawns, through an [`ExecContext`]. The runner never
//! changes its own working directory or environment.

use crate::error::{Error, Result};
use crate::model::{Code, Data, Program, Task};
use sourcekit::{CacheDir, ExecContext, LocalHandle, Source};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// Which list an entry belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Data,
    Code,
}

impl fmt::Display for EntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Data => f.write_str("data"),
            Self::Code => f.write_str("code"),
        }
    }
}

/// Identifies an entry in progress reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub kind: EntryKind,
    /// Position within its list.
    pub index: usize,
    /// Label, or a description of the source or command.
    pub label: String,
}

/// Progress callback for task runs
///
/// Implement this trait to receive progress updates while a task runs.
pub trait ProgressCallback {
    /// Called before an entry is staged
    fn on_entry_start(&mut self, entry: &Entry);

    /// Called after an entry completed successfully
    fn on_entry_success(&mut self, entry: &Entry);

    /// Called when an entry failed; no further entries run
    fn on_entry_failure(&mut self, entry: &Entry, error: &sourcekit::Error);
}

/// No-op progress callback
pub struct NoProgress;

impl ProgressCallback for NoProgress {
    fn on_entry_start(&mut self, _entry: &Entry) {}
    fn on_entry_success(&mut self, _entry: &Entry) {}
    fn on_entry_failure(&mut self, _entry: &Entry, _error: &sourcekit::Error) {}
}

/// Counts of completed entries.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub data: usize,
    pub code: usize,
}

/// Runs tasks.
#[derive(Debug, Clone, Default)]
pub struct Runner {
    cache_root: Option<PathBuf>,
    base: ExecContext,
}

impl Runner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create per-entry cache directories under `root` instead of the system
    /// temporary directory.
    pub fn with_cache_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.cache_root = Some(root.into());
        self
    }

    /// Context every entry's context is layered on.
    pub fn with_context(mut self, ctx: ExecContext) -> Self {
        self.base = ctx;
        self
    }

    /// Run all data entries, then all code entries.
    pub fn run<P: ProgressCallback>(&self, task: &Task, progress: &mut P) -> Result<RunSummary> {
        task.validate()?;
        let task_ctx = layer(&self.base, task.cwd.as_deref(), &task.env);
        let mut summary = RunSummary::default();

        for (index, data) in task.data.iter().enumerate() {
            let entry = Entry {
                kind: EntryKind::Data,
                index,
                label: data.describe(),
            };
            self.step(&entry, progress, || self.place(data, &task_ctx))?;
            summary.data += 1;
        }
        for (index, code) in task.code.iter().enumerate() {
            let entry = Entry {
                kind: EntryKind::Code,
                index,
                label: code.describe(),
            };
            self.step(&entry, progress, || self.execute(code, &task_ctx))?;
            summary.code += 1;
        }
        log::info!(
            "Task {} finished: {} data, {} code",
            task.label.as_deref().unwrap_or("(unlabelled)"),
            summary.data,
            summary.code
        );
        Ok(summary)
    }

    fn step<P, F>(&self, entry: &Entry, progress: &mut P, f: F) -> Result<()>
    where
        P: ProgressCallback,
        F: FnOnce() -> sourcekit::Result<()>,
    {
        log::debug!("Starting {} entry {}: {}", entry.kind, entry.index, entry.label);
        progress.on_entry_start(entry);
        match f() {
            Ok(()) => {
                progress.on_entry_success(entry);
                Ok(())
            }
            Err(cause) => {
                log::debug!("{} entry {} failed: {cause}", entry.kind, entry.index);
                progress.on_entry_failure(entry, &cause);
                Err(Error::EntryFailed {
                    label: entry.label.clone(),
                    cause,
                })
            }
        }
    }

    /// Stage `source` into a fresh cache directory. The directory lives as
    /// long as the returned value.
    fn stage(
        &self,
        source: &dyn Source,
        ctx: &ExecContext,
    ) -> sourcekit::Result<(CacheDir, LocalHandle)> {
        let cache = match &self.cache_root {
            Some(root) => CacheDir::new_in(root)?,
            None => CacheDir::new()?,
        };
        let handle = source.cache(&cache, ctx)?;
        Ok((cache, handle))
    }

    fn place(&self, data: &Data, task_ctx: &ExecContext) -> sourcekit::Result<()> {
        let ctx = layer(task_ctx, data.cwd.as_deref(), &data.env);
        let target = match &data.target {
            Some(target) => ctx.resolve(&expand(target)),
            None => working_dir(&ctx),
        };
        let (_cache, handle) = self.stage(data.source.as_ref(), &ctx)?;
        log::info!("Placing {} at {}", data.source.describe(), target.display());
        data.source.place(&handle, &target, &ctx)
    }

    fn execute(&self, code: &Code, task_ctx: &ExecContext) -> sourcekit::Result<()> {
        let ctx = layer(task_ctx, code.cwd.as_deref(), &code.env);
        match &code.program {
            Program::Source(source) => {
                let (_cache, handle) = self.stage(source.as_ref(), &ctx)?;
                source.run(&handle, &code.args, &ctx)
            }
            Program::Cmd(words) => {
                let Some((program, rest)) = words.split_first() else {
                    return Err(sourcekit::Error::not_executable(
                        code.describe(),
                        "the command is empty",
                    ));
                };
                let args: Vec<&String> = rest.iter().chain(&code.args).collect();
                ctx.run(program, &args)
            }
        }
    }
}

/// `ctx` with `cwd` (tilde-expanded, relative to the current working
/// directory of `ctx`) and `env` applied on top.
fn layer(ctx: &ExecContext, cwd: Option<&str>, env: &BTreeMap<String, String>) -> ExecContext {
    let mut layered = ctx.clone().with_envs(env.clone());
    if let Some(cwd) = cwd {
        let dir = layered.resolve(&expand(cwd));
        layered = layered.with_cwd(dir);
    }
    layered
}

fn expand(path: &str) -> PathBuf {
    PathBuf::from(shellexpand::tilde(path).into_owned())
}

fn working_dir(ctx: &ExecContext) -> PathBuf {
    match ctx.cwd() {
        Some(cwd) => cwd.to_path_buf(),
        None => std::env::current_dir().unwrap_or_else(|_| Path::new(".").to_path_buf()),
    }
}
