//! Task, Code and Data entries.

use crate::error::{Error, Result};
use sourcekit::Source;
use std::collections::BTreeMap;
use std::fmt;

/// What a [`Code`] entry executes: a source, or a literal command.
///
/// Exactly one of the two is set, so the type has one variant for each.
#[derive(Debug)]
pub enum Program {
    /// Run the source as a program.
    Source(Box<dyn Source>),
    /// Run a command found on `PATH`; the first word is the program.
    Cmd(Vec<String>),
}

impl PartialEq for Program {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::Source(a), Self::Source(b)) => {
                a.kind() == b.kind() && a.externalize() == b.externalize()
            }
            (Self::Cmd(a), Self::Cmd(b)) => a == b,
            _ => false,
        }
    }
}

impl fmt::Display for Program {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Source(source) => f.write_str(&source.describe()),
            Self::Cmd(words) => f.write_str(&words.join(" ")),
        }
    }
}

/// A program to run, with its arguments and context.
#[derive(Debug, PartialEq)]
pub struct Code {
    pub program: Program,
    pub args: Vec<String>,
    pub cwd: Option<String>,
    pub env: BTreeMap<String, String>,
    pub label: Option<String>,
}

impl Code {
    fn with_program(program: Program) -> Self {
        Self {
            program,
            args: Vec::new(),
            cwd: None,
            env: BTreeMap::new(),
            label: None,
        }
    }

    /// Run `source`.
    pub fn source(source: Box<dyn Source>) -> Self {
        Self::with_program(Program::Source(source))
    }

    /// Run a literal command.
    pub fn cmd<I, S>(words: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::with_program(Program::Cmd(words.into_iter().map(Into::into).collect()))
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The label, or a description of the program.
    pub fn describe(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.program.to_string())
    }

    fn validate(&self) -> Result<()> {
        if let Program::Cmd(words) = &self.program {
            if words.first().is_none_or(String::is_empty) {
                return Err(Error::manifest("a Code cmd must name a program"));
            }
        }
        validate_env(&self.env)
    }
}

/// A source to place on disk.
#[derive(Debug)]
pub struct Data {
    pub source: Box<dyn Source>,
    /// Where to place it; the effective working directory when unset.
    pub target: Option<String>,
    pub cwd: Option<String>,
    pub env: BTreeMap<String, String>,
    pub label: Option<String>,
}

impl PartialEq for Data {
    fn eq(&self, other: &Self) -> bool {
        self.source.kind() == other.source.kind()
            && self.source.externalize() == other.source.externalize()
            && self.target == other.target
            && self.cwd == other.cwd
            && self.env == other.env
            && self.label == other.label
    }
}

impl Data {
    pub fn new(source: Box<dyn Source>) -> Self {
        Self {
            source,
            target: None,
            cwd: None,
            env: BTreeMap::new(),
            label: None,
        }
    }

    pub fn with_target(mut self, target: impl Into<String>) -> Self {
        self.target = Some(target.into());
        self
    }

    pub fn with_cwd(mut self, cwd: impl Into<String>) -> Self {
        self.cwd = Some(cwd.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// The label, or a description of the source.
    pub fn describe(&self) -> String {
        self.label
            .clone()
            .unwrap_or_else(|| self.source.describe())
    }

    fn validate(&self) -> Result<()> {
        if self.target.as_deref() == Some("") {
            return Err(Error::manifest(format!(
                "{}: an empty target is not allowed",
                self.describe()
            )));
        }
        validate_env(&self.env)
    }
}

fn validate_env(env: &BTreeMap<String, String>) -> Result<()> {
    for (key, value) in env {
        if key.is_empty() || key.contains('=') || key.contains('\0') {
            return Err(Error::manifest(format!(
                "invalid environment variable name {key:?}"
            )));
        }
        if value.contains('\0') {
            return Err(Error::manifest(format!(
                "environment variable {key} contains a NUL byte"
            )));
        }
    }
    Ok(())
}

/// An ordered list of data to place and code to run.
///
/// `cwd` and `env` are defaults for every entry. All data is placed before
/// any code runs.
#[derive(Debug, Default, PartialEq)]
pub struct Task {
    pub code: Vec<Code>,
    pub data: Vec<Data>,
    pub cwd: Option<String>,
    pub env: BTreeMap<String, String>,
    pub label: Option<String>,
}

impl Task {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a code entry.
    pub fn push_code(&mut self, code: Code) -> &mut Self {
        self.code.push(code);
        self
    }

    /// Append a data entry.
    pub fn push_data(&mut self, data: Data) -> &mut Self {
        self.data.push(data);
        self
    }

    /// Remove every code entry equal to `code`; returns how many were removed.
    pub fn remove_code(&mut self, code: &Code) -> usize {
        let before = self.code.len();
        self.code.retain(|c| c != code);
        before - self.code.len()
    }

    /// Remove every data entry equal to `data`; returns how many were removed.
    pub fn remove_data(&mut self, data: &Data) -> usize {
        let before = self.data.len();
        self.data.retain(|d| d != data);
        before - self.data.len()
    }

    /// Whether there is nothing to do.
    pub fn is_empty(&self) -> bool {
        self.code.is_empty() && self.data.is_empty()
    }

    /// Check entries for problems that would only surface while running.
    pub fn validate(&self) -> Result<()> {
        validate_env(&self.env)?;
        self.data.iter().try_for_each(Data::validate)?;
        self.code.iter().try_for_each(Code::validate)
    }
}

impl serde::Serialize for Task {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serde::Serialize::serialize(&crate::idiom::simplify_task(self), serializer)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sourcekit::InlineText;

    fn text(body: &str) -> Box<dyn Source> {
        Box::new(InlineText::new(body).unwrap())
    }

    #[test]
    fn test_push_and_remove() {
        let mut task = Task::new();
        task.push_code(Code::cmd(["true"]))
            .push_code(Code::cmd(["false"]))
            .push_code(Code::cmd(["true"]))
            .push_data(Data::new(text("a")).with_target("a.txt"));

        assert_eq!(task.remove_code(&Code::cmd(["true"])), 2);
        assert_eq!(task.code, vec![Code::cmd(["false"])]);

        assert_eq!(task.remove_data(&Data::new(text("a"))), 0);
        assert_eq!(task.remove_data(&Data::new(text("a")).with_target("a.txt")), 1);
        assert!(task.data.is_empty());
    }

    #[test]
    fn test_source_equality_by_literal() {
        assert_eq!(Code::source(text("x")), Code::source(text("x")));
        assert_ne!(Code::source(text("x")), Code::source(text("y")));
        assert_ne!(Code::source(text("x")), Code::cmd(["x"]));
    }

    #[test]
    fn test_validate() {
        let mut task = Task::new();
        task.push_code(Code::cmd(["echo", "hi"]).with_env("GREETING", "hi"));
        assert!(task.validate().is_ok());

        task.push_code(Code::cmd(Vec::<String>::new()));
        assert!(matches!(task.validate(), Err(Error::Manifest(_))));

        let mut task = Task::new();
        task.env.insert("A=B".to_string(), "c".to_string());
        assert!(matches!(task.validate(), Err(Error::Manifest(_))));

        let mut task = Task::new();
        task.push_data(Data::new(text("a")).with_target(""));
        assert!(matches!(task.validate(), Err(Error::Manifest(_))));
    }

    #[test]
    fn test_describe_prefers_label() {
        let code = Code::cmd(["make", "install"]);
        assert_eq!(code.describe(), "make install");
        assert_eq!(code.with_label("build").describe(), "build");
    }
}
