//! Reading manifest files.
//!
//! `.toml` files are TOML; anything else is JSON. The manifest's directory
//! anchors `file:///@/./` references.

use anyhow::{Context, Result};
use bundle::{Task, idiom};
use sourcekit::{Interpreter, Literal, Origin};
use std::fs;
use std::path::Path;

/// Serialization format of a manifest file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ManifestFormat {
    Json,
    Toml,
}

impl ManifestFormat {
    /// Pick the format from the file extension.
    pub fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::Toml,
            _ => Self::Json,
        }
    }

    /// Parse manifest text into a literal.
    pub fn parse(self, text: &str) -> Result<Literal> {
        match self {
            Self::Json => serde_json::from_str(text).context("Invalid JSON manifest"),
            Self::Toml => toml::from_str(text).context("Invalid TOML manifest"),
        }
    }
}

/// A manifest read from disk, with the interpreter anchored at its directory.
pub struct Loaded {
    pub task: Task,
    pub interpreter: Interpreter,
}

/// Read and ingest the manifest at `path`.
pub fn load(path: &Path) -> Result<Loaded> {
    let path = fs::canonicalize(path)
        .with_context(|| format!("Manifest not found: {}", path.display()))?;
    let text = fs::read_to_string(&path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let literal = ManifestFormat::from_path(&path)
        .parse(&text)
        .with_context(|| format!("Failed to parse {}", path.display()))?;

    let origin = match path.parent() {
        Some(dir) => Origin::manifest_dir(dir),
        None => Origin::default(),
    };
    let interpreter = Interpreter::new(origin);
    let task = idiom::ingest_task(&literal, &interpreter)
        .with_context(|| format!("Invalid manifest {}", path.display()))?;
    log::debug!("Loaded manifest {}", path.display());
    Ok(Loaded { task, interpreter })
}

/// Parse a command line source literal: JSON when it starts with `{`,
/// otherwise a URL.
pub fn parse_literal(input: &str) -> Result<Literal> {
    if input.trim_start().starts_with('{') {
        serde_json::from_str(input).context("Invalid JSON source literal")
    } else {
        Ok(Literal::from(input))
    }
}
