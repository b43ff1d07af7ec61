use anyhow::Result;
use std::path::Path;

use crate::manifest;

pub fn run(path: &Path) -> Result<()> {
    let loaded = manifest::load(path)?;
    println!("{}", serde_json::to_string_pretty(&loaded.task)?);
    Ok(())
}
