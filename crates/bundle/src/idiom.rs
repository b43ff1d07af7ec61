//! Manifest literals to tasks, and back.
//!
//! Manifests favour short forms. Ingesting accepts all of them; simplifying
//! picks the shortest form that ingests back to an equivalent entry.
//!
//! # Code
//!
//! | Literal                            | Ingested as                          |
//! |------------------------------------|--------------------------------------|
//! | `"make"`                           | `cmd = ["make"]`                     |
//! | `"https://x/setup.sh"`             | `source = https://x/setup.sh`        |
//! | `["make", "-j4"]`                  | `cmd = ["make"]`, `args = ["-j4"]`   |
//! | `["s3://b/run.sh", "--fast"]`      | `source = s3://b/run.sh`, `args`     |
//! | `{cmd: "make", args: [...], ...}`  | `cmd = ["make"]`, ...                |
//! | `{source: ..., args: [...], ...}`  | as written                           |
//!
//! A word is a source when it contains `://`. A mapping must set exactly one
//! of `cmd` and `source`.
//!
//! Simplifying tries, in order:
//!
//! 1. a string, when the entry has no `args`, `cwd`, `env` or `label`, and is
//!    a source whose literal is a string or a one-word `cmd`;
//! 2. an array, when the entry has no `cwd`, `env` or `label`: the source
//!    string or the `cmd` words, followed by `args`;
//! 3. a mapping with empty fields omitted.
//!
//! A `cmd` whose first word contains `://` always takes the mapping form,
//! since the short forms would read it back as a source. Likewise a source
//! whose URL has no `://` (`file:/x`) is written under `source`.
//!
//! # Data
//!
//! | Literal                                   | Ingested as                     |
//! |-------------------------------------------|---------------------------------|
//! | `"https://x/a.txt"`                       | `source`, no target             |
//! | `{"https://x/a.txt": "etc/a.txt"}`        | `source`, `target`              |
//! | `{source: ..., target: ..., env: ...}`    | as written                      |
//!
//! Simplifying tries, in order:
//!
//! 1. a string, when the source's literal is a string and nothing else is set;
//! 2. a one-key `{source: target}` mapping, when the source's literal is a
//!    string and only `target` is set;
//! 3. a mapping with empty fields omitted.

use crate::error::{Error, Result};
use crate::model::{Code, Data, Program, Task};
use sourcekit::{Interpreter, Literal};
use std::collections::BTreeMap;

const TASK_KEYS: &[&str] = &["code", "data", "cwd", "env", "label"];
const CODE_KEYS: &[&str] = &["source", "cmd", "args", "cwd", "env", "label"];
const DATA_KEYS: &[&str] = &["source", "target", "cwd", "env", "label"];

/// Read a whole task.
pub fn ingest_task(literal: &Literal, interpreter: &Interpreter) -> Result<Task> {
    let map = literal
        .as_map()
        .ok_or_else(|| Error::manifest(format!("a task must be a mapping, got {}", literal.type_name())))?;
    check_keys(map, TASK_KEYS, "task")?;

    let mut task = Task::new();
    for (i, item) in items(map, "code")?.iter().enumerate() {
        let code = ingest_code(item, interpreter).map_err(|e| at("code", i, e))?;
        task.push_code(code);
    }
    for (i, item) in items(map, "data")?.iter().enumerate() {
        let data = ingest_data(item, interpreter).map_err(|e| at("data", i, e))?;
        task.push_data(data);
    }
    task.cwd = optional_string(map, "cwd")?;
    task.env = env(map)?;
    task.label = optional_string(map, "label")?;
    log::debug!(
        "Ingested task with {} data and {} code entries",
        task.data.len(),
        task.code.len()
    );
    Ok(task)
}

/// Read one `code` item.
pub fn ingest_code(literal: &Literal, interpreter: &Interpreter) -> Result<Code> {
    match literal {
        Literal::Str(word) => from_words(vec![word.clone()], interpreter),
        Literal::Seq(items) => {
            let words = items
                .iter()
                .map(|item| scalar(item, "code"))
                .collect::<Result<Vec<_>>>()?;
            from_words(words, interpreter)
        }
        Literal::Map(map) => {
            check_keys(map, CODE_KEYS, "code")?;
            let program = match (field(map, "source"), field(map, "cmd")) {
                (Some(_), Some(_)) => {
                    return Err(Error::manifest("a code entry has either cmd or source, not both"));
                }
                (None, None) => {
                    return Err(Error::manifest("a code entry needs one of cmd or source"));
                }
                (Some(source), None) => Program::Source(interpreter.interpret_literal(source)?),
                (None, Some(Literal::Str(cmd))) => Program::Cmd(vec![cmd.clone()]),
                (None, Some(cmd)) => Program::Cmd(strings(cmd, "cmd")?),
            };
            Ok(Code {
                program,
                args: match field(map, "args") {
                    Some(args) => strings(args, "args")?,
                    None => Vec::new(),
                },
                cwd: optional_string(map, "cwd")?,
                env: env(map)?,
                label: optional_string(map, "label")?,
            })
        }
        other => Err(Error::manifest(format!(
            "a code entry must be a string, an array or a mapping, got {}",
            other.type_name()
        ))),
    }
}

fn from_words(words: Vec<String>, interpreter: &Interpreter) -> Result<Code> {
    let mut words = words.into_iter();
    let first = words
        .next()
        .filter(|w| !w.is_empty())
        .ok_or_else(|| Error::manifest("a code entry can not be empty"))?;
    let code = if is_source_word(&first) {
        Code::source(interpreter.interpret(first.as_str())?)
    } else {
        Code::cmd([first])
    };
    Ok(code.with_args(words))
}

/// Read one `data` item.
pub fn ingest_data(literal: &Literal, interpreter: &Interpreter) -> Result<Data> {
    match literal {
        Literal::Str(_) => Ok(Data::new(interpreter.interpret_literal(literal)?)),
        Literal::Map(map) if map.contains_key("source") => {
            check_keys(map, DATA_KEYS, "data")?;
            let source = field(map, "source")
                .ok_or_else(|| Error::manifest("a data entry needs a source"))?;
            Ok(Data {
                source: interpreter.interpret_literal(source)?,
                target: optional_string(map, "target")?,
                cwd: optional_string(map, "cwd")?,
                env: env(map)?,
                label: optional_string(map, "label")?,
            })
        }
        Literal::Map(map) => match map.iter().next() {
            Some((source, target)) if map.len() == 1 => {
                let data = Data::new(interpreter.interpret(source.as_str())?);
                Ok(data.with_target(scalar(target, "target")?))
            }
            _ => Err(Error::manifest(
                "a data mapping without source must be a single {source: target} pair",
            )),
        },
        other => Err(Error::manifest(format!(
            "a data entry must be a string or a mapping, got {}",
            other.type_name()
        ))),
    }
}

/// Whether a word of a string or array code entry names a source.
fn is_source_word(word: &str) -> bool {
    word.contains("://")
}

fn at(list: &str, index: usize, err: Error) -> Error {
    match err {
        Error::Manifest(message) => Error::manifest(format!("{list}[{index}]: {message}")),
        other => other,
    }
}

fn check_keys(map: &BTreeMap<String, Literal>, allowed: &[&str], what: &str) -> Result<()> {
    match map.keys().find(|k| !allowed.contains(&k.as_str())) {
        Some(key) => Err(Error::manifest(format!(
            "unknown {what} field {key:?} (expected one of: {})",
            allowed.join(", ")
        ))),
        None => Ok(()),
    }
}

/// A field, treating null as absent.
fn field<'a>(map: &'a BTreeMap<String, Literal>, key: &str) -> Option<&'a Literal> {
    map.get(key).filter(|v| **v != Literal::Null)
}

fn items<'a>(map: &'a BTreeMap<String, Literal>, key: &str) -> Result<&'a [Literal]> {
    match field(map, key) {
        None => Ok(&[]),
        Some(value) => value
            .as_seq()
            .ok_or_else(|| Error::manifest(format!("{key} must be a list, got {}", value.type_name()))),
    }
}

fn scalar(value: &Literal, what: &str) -> Result<String> {
    match value {
        Literal::Str(s) => Ok(s.clone()),
        Literal::Bool(_) | Literal::Int(_) | Literal::Float(_) => Ok(value.to_string()),
        other => Err(Error::manifest(format!(
            "{what} must be a string, got {}",
            other.type_name()
        ))),
    }
}

fn strings(value: &Literal, what: &str) -> Result<Vec<String>> {
    value
        .as_seq()
        .ok_or_else(|| Error::manifest(format!("{what} must be a list, got {}", value.type_name())))?
        .iter()
        .map(|item| scalar(item, what))
        .collect()
}

fn optional_string(map: &BTreeMap<String, Literal>, key: &str) -> Result<Option<String>> {
    field(map, key).map(|v| scalar(v, key)).transpose()
}

fn env(map: &BTreeMap<String, Literal>) -> Result<BTreeMap<String, String>> {
    let Some(value) = field(map, "env") else {
        return Ok(BTreeMap::new());
    };
    value
        .as_map()
        .ok_or_else(|| Error::manifest(format!("env must be a mapping, got {}", value.type_name())))?
        .iter()
        .map(|(k, v)| Ok((k.clone(), scalar(v, "env value")?)))
        .collect()
}

/// Shortest literal for a task; empty fields are omitted.
pub fn simplify_task(task: &Task) -> Literal {
    let mut map = BTreeMap::new();
    if !task.code.is_empty() {
        map.insert(
            "code".to_string(),
            Literal::Seq(task.code.iter().map(simplify_code).collect()),
        );
    }
    if !task.data.is_empty() {
        map.insert(
            "data".to_string(),
            Literal::Seq(task.data.iter().map(simplify_data).collect()),
        );
    }
    insert_context(&mut map, task.cwd.as_ref(), &task.env, task.label.as_ref());
    Literal::Map(map)
}

/// Shortest literal for a code entry.
pub fn simplify_code(code: &Code) -> Literal {
    let bare = code.cwd.is_none() && code.env.is_empty() && code.label.is_none();
    let words: Option<Vec<String>> = match &code.program {
        Program::Source(source) => match source.externalize() {
            Literal::Str(url) if is_source_word(&url) => Some(vec![url]),
            _ => None,
        },
        Program::Cmd(words) => match words.first() {
            Some(first) if !first.is_empty() && !is_source_word(first) => Some(words.clone()),
            _ => None,
        },
    };

    if bare {
        if let Some(mut words) = words {
            words.extend(code.args.iter().cloned());
            return match <[String; 1]>::try_from(words) {
                Ok([word]) => Literal::Str(word),
                Err(words) => Literal::Seq(words.into_iter().map(Literal::Str).collect()),
            };
        }
    }

    let mut map = BTreeMap::new();
    match &code.program {
        Program::Source(source) => {
            map.insert("source".to_string(), source.externalize());
        }
        Program::Cmd(words) if words.len() == 1 => {
            map.insert("cmd".to_string(), Literal::Str(words[0].clone()));
        }
        Program::Cmd(words) => {
            map.insert("cmd".to_string(), string_seq(words));
        }
    }
    if !code.args.is_empty() {
        map.insert("args".to_string(), string_seq(&code.args));
    }
    insert_context(&mut map, code.cwd.as_ref(), &code.env, code.label.as_ref());
    Literal::Map(map)
}

/// Shortest literal for a data entry.
pub fn simplify_data(data: &Data) -> Literal {
    let source = data.source.externalize();
    let bare = data.cwd.is_none() && data.env.is_empty() && data.label.is_none();
    if let (true, Literal::Str(url)) = (bare, &source) {
        return match &data.target {
            None => source.clone(),
            Some(target) => Literal::single(url.clone(), target.clone()),
        };
    }

    let mut map = BTreeMap::new();
    map.insert("source".to_string(), source);
    if let Some(target) = &data.target {
        map.insert("target".to_string(), Literal::Str(target.clone()));
    }
    insert_context(&mut map, data.cwd.as_ref(), &data.env, data.label.as_ref());
    Literal::Map(map)
}

fn string_seq(words: &[String]) -> Literal {
    Literal::Seq(words.iter().cloned().map(Literal::Str).collect())
}

fn insert_context(
    map: &mut BTreeMap<String, Literal>,
    cwd: Option<&String>,
    env: &BTreeMap<String, String>,
    label: Option<&String>,
) {
    if let Some(cwd) = cwd {
        map.insert("cwd".to_string(), Literal::Str(cwd.clone()));
    }
    if !env.is_empty() {
        let env = env
            .iter()
            .map(|(k, v)| (k.clone(), Literal::Str(v.clone())))
            .collect::<BTreeMap<_, _>>();
        map.insert("env".to_string(), Literal::Map(env));
    }
    if let Some(label) = label {
        map.insert("label".to_string(), Literal::Str(label.clone()));
    }
}
