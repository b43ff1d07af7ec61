//! Sources whose payload is embedded in the manifest.
//!
//! | Key          | Source                 | Payload                       |
//! |--------------|------------------------|-------------------------------|
//! | `text`       | [`InlineText`]         | text-safe string              |
//! | `data`       | [`InlineBinary`]       | bytes, or a string's bytes    |
//! | `base64`     | [`InlineBinary`]       | base64 text                   |
//! | `jar`/`jar64`| [`InlineJar`]          | bytes / base64 text           |
//! | `tgz`/`tgz64`| [`InlineTarGz`]        | bytes / base64 text           |
//! | `collection` | [`InlineCollection`]   | nested mapping or sequence    |
//!
//! Binary payloads remember how they were written so that externalizing
//! gives back the key and encoding they were ingested under. Base64 text is
//! given back as written; [`encode_base64`] wraps fresh output at 64 columns.

use crate::archive;
use crate::cache::CacheDir;
use crate::error::{Error, Result};
use crate::exec::{self, ExecContext};
use crate::literal::Literal;
use crate::source::{LocalHandle, Source, SourceKind};
use base64::Engine;
use std::fs;
use std::io::Cursor;
use std::path::Path;

/// Column width of externalized base64.
pub const BASE64_WIDTH: usize = 64;

/// Whether `text` may be carried by an [`InlineText`]: printable ASCII plus
/// tab, newline and carriage return.
pub fn is_text_safe(text: &[u8]) -> bool {
    text.iter()
        .all(|b| matches!(b, b' '..=b'~' | b'\t' | b'\n' | b'\r'))
}

/// Encode as base64 wrapped at [`BASE64_WIDTH`] columns.
pub fn encode_base64(bytes: &[u8]) -> String {
    let encoded = base64::engine::general_purpose::STANDARD.encode(bytes);
    encoded
        .as_bytes()
        .chunks(BASE64_WIDTH)
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Decode base64, ignoring whitespace.
pub fn decode_base64(text: &str) -> Result<Vec<u8>> {
    let compact: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    base64::engine::general_purpose::STANDARD
        .decode(compact)
        .map_err(|e| Error::BadSourceFormat(format!("invalid base64: {e}")))
}

/// How a binary payload was written in the manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Encoding {
    /// Raw bytes.
    Bytes,
    /// A string, taken as its UTF-8 bytes.
    Utf8,
    /// Base64 text, kept as written so line breaks survive externalizing.
    Base64(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Payload {
    bytes: Vec<u8>,
    encoding: Encoding,
}

impl Payload {
    fn raw(value: &Literal, key: &str) -> Result<Self> {
        match value {
            Literal::Bytes(bytes) => Ok(Self {
                bytes: bytes.clone(),
                encoding: Encoding::Bytes,
            }),
            Literal::Str(text) => Ok(Self {
                bytes: text.clone().into_bytes(),
                encoding: Encoding::Utf8,
            }),
            other => Err(wrong_type(key, "bytes or a string", other)),
        }
    }

    fn base64(value: &Literal, key: &str) -> Result<Self> {
        let text = value
            .as_str()
            .ok_or_else(|| wrong_type(key, "a base64 string", value))?;
        Ok(Self {
            bytes: decode_base64(text)?,
            encoding: Encoding::Base64(text.to_owned()),
        })
    }

    fn externalize(&self, raw_key: &str, base64_key: &str) -> Literal {
        match &self.encoding {
            Encoding::Bytes => Literal::single(raw_key, self.bytes.clone()),
            Encoding::Utf8 => Literal::single(
                raw_key,
                String::from_utf8_lossy(&self.bytes).into_owned(),
            ),
            Encoding::Base64(text) => Literal::single(base64_key, text.as_str()),
        }
    }

    fn write(&self, dest: &Path) -> Result<()> {
        ensure_parent(dest)?;
        fs::write(dest, &self.bytes).map_err(|e| Error::io(dest, e))
    }
}

fn wrong_type(key: &str, expected: &str, got: &Literal) -> Error {
    Error::BadSourceFormat(format!(
        "{key} expects {expected}, got {}",
        got.type_name()
    ))
}

fn ensure_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))
        }
        _ => Ok(()),
    }
}

fn clip(bytes: &[u8]) -> String {
    let shown = String::from_utf8_lossy(&bytes[..bytes.len().min(20)]).into_owned();
    if bytes.len() > 20 {
        format!("{shown}...")
    } else {
        shown
    }
}

/// Human readable text, written with surrounding whitespace trimmed and one
/// trailing newline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineText {
    text: String,
}

impl InlineText {
    /// Accepts only text-safe payloads; binary content belongs in
    /// [`InlineBinary`].
    pub fn new(text: impl Into<String>) -> Result<Self> {
        let text = text.into();
        if !is_text_safe(text.as_bytes()) {
            return Err(Error::BadSourceFormat(
                "text contains bytes that are not printable ASCII; use data or base64".to_string(),
            ));
        }
        Ok(Self { text })
    }

    pub(crate) fn from_literal(value: &Literal) -> Result<Self> {
        let text = value
            .as_str()
            .ok_or_else(|| wrong_type("text", "a string", value))?;
        Self::new(text)
    }

    /// The text as written in the manifest.
    pub fn text(&self) -> &str {
        &self.text
    }

    fn write(&self, dest: &Path) -> Result<()> {
        ensure_parent(dest)?;
        fs::write(dest, format!("{}\n", self.text.trim())).map_err(|e| Error::io(dest, e))
    }
}

impl Source for InlineText {
    fn kind(&self) -> SourceKind {
        SourceKind::InlineText
    }

    fn cache(&self, cache: &CacheDir, _ctx: &ExecContext) -> Result<LocalHandle> {
        Ok(LocalHandle::inline(cache))
    }

    fn place(&self, _handle: &LocalHandle, dest: &Path, _ctx: &ExecContext) -> Result<()> {
        self.write(dest)
    }

    fn run(&self, handle: &LocalHandle, args: &[String], ctx: &ExecContext) -> Result<()> {
        let program = handle.scratch().join("data");
        self.write(&program)?;
        exec::make_executable(&program)?;
        ctx.run(&program, args)
    }

    fn externalize(&self) -> Literal {
        Literal::single("text", self.text.clone())
    }

    fn describe(&self) -> String {
        format!("text {:?}", clip(self.text.as_bytes()))
    }
}

/// Arbitrary bytes, written verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineBinary {
    payload: Payload,
}

impl InlineBinary {
    /// Raw bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: Payload {
                bytes: bytes.into(),
                encoding: Encoding::Bytes,
            },
        }
    }

    /// From base64 text; externalizes back to base64.
    pub fn base64(text: &str) -> Result<Self> {
        Self::from_literal(&Literal::Str(text.to_string()), true)
    }

    pub(crate) fn from_literal(value: &Literal, base64: bool) -> Result<Self> {
        let payload = if base64 {
            Payload::base64(value, "base64")?
        } else {
            Payload::raw(value, "data")?
        };
        Ok(Self { payload })
    }

    /// The payload.
    pub fn bytes(&self) -> &[u8] {
        &self.payload.bytes
    }
}

impl Source for InlineBinary {
    fn kind(&self) -> SourceKind {
        SourceKind::InlineBinary
    }

    fn cache(&self, cache: &CacheDir, _ctx: &ExecContext) -> Result<LocalHandle> {
        Ok(LocalHandle::inline(cache))
    }

    fn place(&self, _handle: &LocalHandle, dest: &Path, _ctx: &ExecContext) -> Result<()> {
        self.payload.write(dest)
    }

    fn run(&self, handle: &LocalHandle, args: &[String], ctx: &ExecContext) -> Result<()> {
        let program = handle.scratch().join("data");
        self.payload.write(&program)?;
        exec::make_executable(&program)?;
        ctx.run(&program, args)
    }

    fn externalize(&self) -> Literal {
        self.payload.externalize("data", "base64")
    }

    fn describe(&self) -> String {
        format!("data {:?}", clip(&self.payload.bytes))
    }
}

/// A gzipped tarball, extracted into a directory on placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineTarGz {
    payload: Payload,
}

impl InlineTarGz {
    /// Raw archive bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: Payload {
                bytes: bytes.into(),
                encoding: Encoding::Bytes,
            },
        }
    }

    /// From base64 text; externalizes back to base64.
    pub fn base64(text: &str) -> Result<Self> {
        Self::from_literal(&Literal::Str(text.to_string()), true)
    }

    pub(crate) fn from_literal(value: &Literal, base64: bool) -> Result<Self> {
        let payload = if base64 {
            Payload::base64(value, "tgz64")?
        } else {
            Payload::raw(value, "tgz")?
        };
        Ok(Self { payload })
    }

    /// The archive bytes.
    pub fn bytes(&self) -> &[u8] {
        &self.payload.bytes
    }
}

impl Source for InlineTarGz {
    fn kind(&self) -> SourceKind {
        SourceKind::InlineTarGz
    }

    fn cache(&self, cache: &CacheDir, _ctx: &ExecContext) -> Result<LocalHandle> {
        Ok(LocalHandle::inline(cache))
    }

    fn place(&self, _handle: &LocalHandle, dest: &Path, _ctx: &ExecContext) -> Result<()> {
        archive::extract(Cursor::new(&self.payload.bytes), None, dest)
    }

    fn run(&self, _handle: &LocalHandle, _args: &[String], _ctx: &ExecContext) -> Result<()> {
        Err(Error::not_executable(
            self.describe(),
            "inline tarballs are not executable",
        ))
    }

    fn externalize(&self) -> Literal {
        self.payload.externalize("tgz", "tgz64")
    }

    fn describe(&self) -> String {
        format!("tgz of {} bytes", self.payload.bytes.len())
    }
}

/// A Java archive, run with `java -jar`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineJar {
    payload: Payload,
}

impl InlineJar {
    /// Raw jar bytes.
    pub fn new(bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            payload: Payload {
                bytes: bytes.into(),
                encoding: Encoding::Bytes,
            },
        }
    }

    /// From base64 text; externalizes back to base64.
    pub fn base64(text: &str) -> Result<Self> {
        Self::from_literal(&Literal::Str(text.to_string()), true)
    }

    pub(crate) fn from_literal(value: &Literal, base64: bool) -> Result<Self> {
        let payload = if base64 {
            Payload::base64(value, "jar64")?
        } else {
            Payload::raw(value, "jar")?
        };
        Ok(Self { payload })
    }
}

impl Source for InlineJar {
    fn kind(&self) -> SourceKind {
        SourceKind::InlineJar
    }

    fn cache(&self, cache: &CacheDir, _ctx: &ExecContext) -> Result<LocalHandle> {
        Ok(LocalHandle::inline(cache))
    }

    fn place(&self, _handle: &LocalHandle, dest: &Path, _ctx: &ExecContext) -> Result<()> {
        self.payload.write(dest)
    }

    fn run(&self, handle: &LocalHandle, args: &[String], ctx: &ExecContext) -> Result<()> {
        let jar = handle.scratch().join("data.jar");
        self.payload.write(&jar)?;
        archive::run_jar(&jar, args, ctx)
    }

    fn externalize(&self) -> Literal {
        self.payload.externalize("jar", "jar64")
    }

    fn describe(&self) -> String {
        format!("jar of {} bytes", self.payload.bytes.len())
    }
}

/// A nested mapping or sequence unpacked into a directory tree.
///
/// Mapping keys become file and directory names. Sequence items are named by
/// their index, zero-padded to a common width. Scalars are written as text
/// with one trailing newline, bytes verbatim, and null as an empty file.
#[derive(Debug, Clone, PartialEq)]
pub struct InlineCollection {
    collection: Literal,
}

impl InlineCollection {
    /// Accepts a mapping or a sequence whose mapping keys are plain names.
    pub fn new(collection: Literal) -> Result<Self> {
        if !collection.is_container() {
            return Err(wrong_type(
                "collection",
                "a mapping or a sequence",
                &collection,
            ));
        }
        check_names(&collection)?;
        Ok(Self { collection })
    }

    /// The collection as written.
    pub fn collection(&self) -> &Literal {
        &self.collection
    }
}

fn check_names(value: &Literal) -> Result<()> {
    match value {
        Literal::Map(map) => {
            for (name, child) in map {
                if name.is_empty()
                    || name == "."
                    || name == ".."
                    || name.contains('/')
                    || name.contains('\\')
                {
                    return Err(Error::BadSourceFormat(format!(
                        "collection entry {name:?} is not a plain file name"
                    )));
                }
                check_names(child)?;
            }
            Ok(())
        }
        Literal::Seq(items) => items.iter().try_for_each(check_names),
        _ => Ok(()),
    }
}

fn unpack(under: &Path, value: &Literal) -> Result<()> {
    match value {
        Literal::Map(map) => {
            fs::create_dir_all(under).map_err(|e| Error::io(under, e))?;
            for (name, child) in map {
                unpack(&under.join(name), child)?;
            }
            Ok(())
        }
        Literal::Seq(items) => {
            fs::create_dir_all(under).map_err(|e| Error::io(under, e))?;
            let width = items.len().saturating_sub(1).to_string().len();
            for (i, child) in items.iter().enumerate() {
                unpack(&under.join(format!("{i:0width$}")), child)?;
            }
            Ok(())
        }
        Literal::Bytes(bytes) => fs::write(under, bytes).map_err(|e| Error::io(under, e)),
        Literal::Null => fs::write(under, b"").map_err(|e| Error::io(under, e)),
        scalar => fs::write(under, format!("{}\n", scalar.to_string().trim()))
            .map_err(|e| Error::io(under, e)),
    }
}

impl Source for InlineCollection {
    fn kind(&self) -> SourceKind {
        SourceKind::InlineCollection
    }

    fn cache(&self, cache: &CacheDir, _ctx: &ExecContext) -> Result<LocalHandle> {
        Ok(LocalHandle::inline(cache))
    }

    fn place(&self, _handle: &LocalHandle, dest: &Path, _ctx: &ExecContext) -> Result<()> {
        unpack(dest, &self.collection)
    }

    fn run(&self, _handle: &LocalHandle, _args: &[String], _ctx: &ExecContext) -> Result<()> {
        Err(Error::not_executable(
            self.describe(),
            "collections can not be executed",
        ))
    }

    fn externalize(&self) -> Literal {
        Literal::single("collection", self.collection.clone())
    }

    fn describe(&self) -> String {
        match &self.collection {
            Literal::Map(map) => format!("collection of {} entries", map.len()),
            Literal::Seq(items) => format!("collection of {} items", items.len()),
            _ => "collection".to_string(),
        }
    }
}

/// Build the inline source for a one-key mapping entry.
pub(crate) fn from_entry(key: &str, value: &Literal) -> Option<Result<Box<dyn Source>>> {
    fn boxed<S: Source + 'static>(r: Result<S>) -> Result<Box<dyn Source>> {
        r.map(|s| Box::new(s) as Box<dyn Source>)
    }
    let source = match key {
        "text" => boxed(InlineText::from_literal(value)),
        "data" => boxed(InlineBinary::from_literal(value, false)),
        "base64" => boxed(InlineBinary::from_literal(value, true)),
        "jar" => boxed(InlineJar::from_literal(value, false)),
        "jar64" => boxed(InlineJar::from_literal(value, true)),
        "tgz" => boxed(InlineTarGz::from_literal(value, false)),
        "tgz64" => boxed(InlineTarGz::from_literal(value, true)),
        "collection" => boxed(InlineCollection::new(value.clone())),
        _ => return None,
    };
    Some(source)
}

/// Mapping keys that select an inline source.
pub const KEYS: &[&str] = &[
    "text",
    "data",
    "base64",
    "jar",
    "jar64",
    "tgz",
    "tgz64",
    "collection",
];
