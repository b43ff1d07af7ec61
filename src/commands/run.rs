use anyhow::Result;
use bundle::{Entry, EntryKind, ProgressCallback, Runner};
use std::path::Path;

use crate::manifest;
use crate::paths;
use crate::ui;
use crate::Context;

/// Prints one line per entry as the task runs
struct UiProgress {
    quiet: bool,
    verbose: bool,
    data: usize,
    code: usize,
}

impl UiProgress {
    fn total(&self, entry: &Entry) -> usize {
        match entry.kind {
            EntryKind::Data => self.data,
            EntryKind::Code => self.code,
        }
    }
}

impl ProgressCallback for UiProgress {
    fn on_entry_start(&mut self, entry: &Entry) {
        if !self.quiet {
            ui::entry(
                entry.index + 1,
                self.total(entry),
                &entry.kind.to_string(),
                &entry.label,
            );
        }
    }

    fn on_entry_success(&mut self, entry: &Entry) {
        log::debug!("{} entry {} done", entry.kind, entry.index);
        if self.verbose && !self.quiet {
            ui::entry_done(&entry.label);
        }
    }

    fn on_entry_failure(&mut self, entry: &Entry, error: &sourcekit::Error) {
        ui::failure(
            &format!("{} {} failed", entry.kind, entry.label),
            Some(&error.to_string()),
        );
    }
}

pub fn run(ctx: &Context, path: &Path) -> Result<()> {
    let loaded = manifest::load(path)?;
    log::debug!(
        "Virtual paths resolve against {}",
        loaded.interpreter.origin().dir().display()
    );
    let task = loaded.task;

    if task.is_empty() {
        ui::note(ui::Mark::Warn, "Nothing to do: the manifest has no data or code");
        return Ok(());
    }

    let mut runner = Runner::new();
    if let Some(root) = paths::cache_root() {
        runner = runner.with_cache_root(root);
    }

    let mut progress = UiProgress {
        quiet: ctx.quiet,
        verbose: ctx.verbose > 0,
        data: task.data.len(),
        code: task.code.len(),
    };
    let summary = runner.run(&task, &mut progress)?;

    if !ctx.quiet {
        ui::note(
            ui::Mark::Done,
            &format!(
                "Placed {} data and ran {} code entries",
                summary.data, summary.code
            ),
        );
    }
    Ok(())
}
