use anyhow::Result;
use sourcekit::{CacheDir, ExecContext, Interpreter};
use std::path::Path;

use crate::manifest;
use crate::paths;
use crate::ui;
use crate::Context;

pub fn run(ctx: &Context, literal: &str, dest: &Path) -> Result<()> {
    let parsed = manifest::parse_literal(literal)?;
    let source = Interpreter::default().interpret_literal(&parsed)?;

    let cache = match paths::cache_root() {
        Some(root) => CacheDir::new_in(root)?,
        None => CacheDir::new()?,
    };
    let exec = ExecContext::new();
    let dest = exec.resolve(&paths::expand(&dest.to_string_lossy()));

    if !ctx.quiet {
        ui::note(ui::Mark::Info, &format!("Fetching {}", source.describe()));
    }
    let handle = source.cache(&cache, &exec)?;
    source.place(&handle, &dest, &exec)?;

    if !ctx.quiet {
        ui::note(ui::Mark::Done, &format!("Placed at {}", dest.display()));
    }
    Ok(())
}
