//! Turning manifest literals into sources.
//!
//! An [`Interpreter`] owns an ordered registry of scheme patterns, each with
//! a constructor. URL strings are parsed and handed to the first constructor
//! whose pattern matches the scheme. One-key mappings select an inline source
//! by their key. Interpreters are passed explicitly to whatever needs one, so
//! two manifests in the same process can resolve `/@/` against different
//! directories.

use crate::archive::ArchiveKind;
use crate::error::{Error, Result};
use crate::git::GitSource;
use crate::http::HttpSource;
use crate::inline;
use crate::literal::Literal;
use crate::local::{FileSource, Origin};
use crate::reference::Reference;
use crate::s3::S3Source;
use crate::source::Source;
use regex::Regex;
use std::fmt;

/// Builds a source from a reference whose scheme matched.
pub type Constructor = fn(Reference, &Origin) -> Result<Box<dyn Source>>;

/// How a registry entry matches a scheme.
#[derive(Debug, Clone)]
pub enum Pattern {
    /// The scheme equals this string.
    Exact(String),
    /// The whole scheme matches this expression.
    Regex(Regex),
}

impl Pattern {
    /// Build a regex pattern, anchored at both ends.
    pub fn regex(expr: &str) -> Result<Self> {
        Regex::new(&format!("^(?:{expr})$"))
            .map(Self::Regex)
            .map_err(|e| Error::BadSourceFormat(format!("invalid scheme pattern {expr:?}: {e}")))
    }

    /// Whether `scheme` matches.
    pub fn matches(&self, scheme: &str) -> bool {
        match self {
            Self::Exact(exact) => exact == scheme,
            Self::Regex(re) => re.is_match(scheme),
        }
    }
}

impl fmt::Display for Pattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Exact(exact) => f.write_str(exact),
            Self::Regex(re) => write!(f, "/{}/", re.as_str()),
        }
    }
}

/// Anything that can be interpreted as a source.
#[derive(Debug)]
pub enum Input {
    /// A manifest literal: a URL string or a one-key mapping.
    Literal(Literal),
    /// An already parsed reference.
    Reference(Reference),
    /// A source that was already interpreted; passed through unchanged.
    Resolved(Box<dyn Source>),
}

impl From<Literal> for Input {
    fn from(literal: Literal) -> Self {
        Self::Literal(literal)
    }
}

impl From<&str> for Input {
    fn from(text: &str) -> Self {
        Self::Literal(Literal::from(text))
    }
}

impl From<Reference> for Input {
    fn from(reference: Reference) -> Self {
        Self::Reference(reference)
    }
}

impl From<Box<dyn Source>> for Input {
    fn from(source: Box<dyn Source>) -> Self {
        Self::Resolved(source)
    }
}

fn boxed<S: Source + 'static>(source: S) -> Box<dyn Source> {
    Box::new(source)
}

fn archive_of(reference: &Reference) -> ArchiveKind {
    ArchiveKind::from_prefix(reference.prefix()).unwrap_or_default()
}

fn http(reference: Reference, _origin: &Origin) -> Result<Box<dyn Source>> {
    HttpSource::new(archive_of(&reference), reference).map(boxed)
}

fn s3(reference: Reference, _origin: &Origin) -> Result<Box<dyn Source>> {
    S3Source::new(archive_of(&reference), reference).map(boxed)
}

fn file(reference: Reference, origin: &Origin) -> Result<Box<dyn Source>> {
    FileSource::new(archive_of(&reference), reference, origin).map(boxed)
}

fn git(reference: Reference, origin: &Origin) -> Result<Box<dyn Source>> {
    GitSource::new(reference, origin).map(boxed)
}

/// Scheme expressions of the standard registry, in dispatch order.
const STANDARD_PATTERNS: &[(&str, Constructor)] = &[
    ("(?:tar\\+|jar\\+)?https?", http),
    ("(?:tar\\+|jar\\+)?s3", s3),
    ("(?:tar\\+|jar\\+)?file", file),
];

const GIT_SCHEMES: &[&str] = &["git+file", "git+http", "git+https", "git+ssh"];

/// Scheme registry plus the origin `/@/.` paths resolve against.
#[derive(Debug, Clone)]
pub struct Interpreter {
    origin: Origin,
    handlers: Vec<(Pattern, Constructor)>,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new(Origin::default())
    }
}

impl Interpreter {
    /// The standard registry, anchored at `origin`.
    pub fn new(origin: Origin) -> Self {
        let mut interpreter = Self::empty(origin);
        for (expr, constructor) in STANDARD_PATTERNS {
            match Pattern::regex(expr) {
                Ok(pattern) => {
                    interpreter.register(pattern, *constructor);
                }
                Err(e) => log::error!("Standard scheme pattern not registered: {e}"),
            }
        }
        for scheme in GIT_SCHEMES {
            interpreter.register(Pattern::Exact((*scheme).to_string()), git);
        }
        interpreter
    }

    /// A registry with no URL handlers. Inline keys are always understood.
    pub fn empty(origin: Origin) -> Self {
        Self {
            origin,
            handlers: Vec::new(),
        }
    }

    /// Append a handler; earlier handlers win.
    pub fn register(&mut self, pattern: Pattern, constructor: Constructor) -> &mut Self {
        self.handlers.push((pattern, constructor));
        self
    }

    /// Directory manifest-relative paths resolve against.
    pub fn origin(&self) -> &Origin {
        &self.origin
    }

    /// The same registry anchored elsewhere.
    pub fn with_origin(&self, origin: Origin) -> Self {
        Self {
            origin,
            handlers: self.handlers.clone(),
        }
    }

    /// Patterns matching `scheme`, in registry order.
    pub fn patterns_for<'a>(&'a self, scheme: &'a str) -> impl Iterator<Item = &'a Pattern> + 'a {
        self.handlers
            .iter()
            .map(|(pattern, _)| pattern)
            .filter(move |pattern| pattern.matches(scheme))
    }

    /// Interpret `input` as a source.
    pub fn interpret(&self, input: impl Into<Input>) -> Result<Box<dyn Source>> {
        match input.into() {
            Input::Resolved(source) => Ok(source),
            Input::Reference(reference) => self.interpret_reference(reference),
            Input::Literal(literal) => self.interpret_literal(&literal),
        }
    }

    /// Interpret a manifest literal.
    pub fn interpret_literal(&self, literal: &Literal) -> Result<Box<dyn Source>> {
        match literal {
            Literal::Str(text) => self.interpret_reference(Reference::parse(text)?),
            Literal::Map(map) => {
                let mut entries = map.iter();
                let (key, value) = match (entries.next(), entries.next()) {
                    (Some(entry), None) => entry,
                    _ => {
                        return Err(Error::BadSourceFormat(format!(
                            "a source mapping must have exactly one key, found {}",
                            map.len()
                        )));
                    }
                };
                log::debug!("Interpreting inline {key} source");
                inline::from_entry(key, value).unwrap_or_else(|| {
                    Err(Error::Unsupported {
                        shape: "inline",
                        kind: key.clone(),
                    })
                })
            }
            other => Err(Error::UnknownSourceFormat(format!(
                "expected a URL string or a one-key mapping, got {}",
                other.type_name()
            ))),
        }
    }

    /// Interpret a parsed reference by its scheme.
    pub fn interpret_reference(&self, reference: Reference) -> Result<Box<dyn Source>> {
        let scheme = reference.scheme().to_string();
        match self
            .handlers
            .iter()
            .find(|(pattern, _)| pattern.matches(&scheme))
        {
            Some((pattern, constructor)) => {
                log::debug!("{} matched {pattern}", reference.display());
                constructor(reference, &self.origin)
            }
            None => Err(Error::Unsupported {
                shape: "URL",
                kind: scheme,
            }),
        }
    }
}
