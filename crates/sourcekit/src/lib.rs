//! Source resolution and execution.
//!
//! This crate turns references to code and data into [`Source`]s that can be
//! staged into a [`CacheDir`], placed on disk and executed:
//!
//! - `http://`, `https://`: fetched with a GET ([`HttpSource`])
//! - `s3://`: transferred with the `aws` CLI, or presigned ([`S3Source`])
//! - `file://`: local paths, with `/@/` virtual directories ([`FileSource`])
//! - `tar+<transport>://`, `jar+<transport>://`: archives over any of the above
//! - `git+<transport>://`: recognised, not yet fetchable ([`GitSource`])
//! - `{text: ...}`, `{base64: ...}`, `{tgz64: ...}`, ...: inline payloads
//!
//! # Example
//!
//! ```
//! use sourcekit::{Interpreter, Literal, Origin, SourceKind};
//!
//! let interpreter = Interpreter::new(Origin::manifest_dir("/srv/app"));
//! let source = interpreter
//!     .interpret("tar+https://example.com/tool-1.2.tgz#/bin/tool")
//!     .unwrap();
//! assert_eq!(source.kind(), SourceKind::HttpTar);
//!
//! let text = interpreter.interpret(Literal::single("text", "echo hi")).unwrap();
//! assert_eq!(text.externalize(), Literal::single("text", "echo hi"));
//! ```

pub mod archive;
pub mod cache;
pub mod error;
pub mod exec;
pub mod git;
pub mod http;
pub mod inline;
pub mod interpreter;
pub mod literal;
pub mod local;
pub mod reference;
pub mod s3;
pub mod source;

pub use archive::ArchiveKind;
pub use cache::CacheDir;
pub use error::{Error, ErrorCategory, Result};
pub use exec::ExecContext;
pub use git::GitSource;
pub use http::HttpSource;
pub use inline::{InlineBinary, InlineCollection, InlineJar, InlineTarGz, InlineText};
pub use interpreter::{Input, Interpreter, Pattern};
pub use literal::Literal;
pub use local::{Anchor, FileSource, Origin};
pub use reference::Reference;
pub use s3::{S3Credentials, S3Presigner, S3Source};
pub use source::{LocalHandle, Source, SourceKind};
