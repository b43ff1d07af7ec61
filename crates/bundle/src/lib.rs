//! # Bundle
//!
//! Task manifests and the runner that carries them out.
//!
//! A [`Task`] holds ordered [`Data`] entries, which place a source on disk,
//! and ordered [`Code`] entries, which run a source or a command. Manifest
//! literals become tasks through [`idiom::ingest_task`] and go back through
//! [`idiom::simplify_task`]; a [`Runner`] executes them.
//!
//! ```no_run
//! use bundle::{NoProgress, Runner, idiom};
//! use sourcekit::{Interpreter, Literal, Origin};
//!
//! let manifest: Literal = serde_json::from_str(
//!     r#"{"data": [{"https://example.com/app.conf": "/etc/app.conf"}], "code": ["make"]}"#,
//! )?;
//! let interpreter = Interpreter::new(Origin::manifest_dir("/srv/app"));
//! let task = idiom::ingest_task(&manifest, &interpreter)?;
//! Runner::new().run(&task, &mut NoProgress)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod error;
pub mod idiom;
pub mod model;
pub mod runner;

pub use error::{Error, Result};
pub use model::{Code, Data, Program, Task};
pub use runner::{Entry, EntryKind, NoProgress, ProgressCallback, RunSummary, Runner};
