#![cfg(unix)]

use bundle::{Entry, EntryKind, Error, ProgressCallback, Runner, idiom};
use serde_json::json;
use sourcekit::{Interpreter, Literal, Origin};
use std::fs;
use std::path::Path;
use tempfile::TempDir;

#[derive(Default)]
struct Recorder {
    events: Vec<String>,
}

impl ProgressCallback for Recorder {
    fn on_entry_start(&mut self, entry: &Entry) {
        self.events.push(format!("start {} {}", entry.kind, entry.index));
    }

    fn on_entry_success(&mut self, entry: &Entry) {
        self.events.push(format!("ok {} {}", entry.kind, entry.index));
    }

    fn on_entry_failure(&mut self, entry: &Entry, _error: &sourcekit::Error) {
        self.events.push(format!("failed {} {}", entry.kind, entry.index));
    }
}

fn task(manifest: serde_json::Value, origin: &Path) -> bundle::Task {
    let interpreter = Interpreter::new(Origin::manifest_dir(origin));
    idiom::ingest_task(&Literal::from(manifest), &interpreter).unwrap()
}

#[test]
fn test_basic_manifest_places_data_before_code() {
    let temp = TempDir::new().unwrap();
    let work = temp.path();
    fs::create_dir(work.join("conf")).unwrap();
    fs::write(work.join("conf/app.conf"), "port = 8080\n").unwrap();

    // Code is listed first; it still only runs once both data entries exist.
    let task = task(
        json!({
            "cwd": work.display().to_string(),
            "code": [
                ["sh", "-c", "cat greeting.txt settings/app.conf >> log"],
                {"cmd": "sh", "args": ["-c", "echo done >> log"], "label": "finish"}
            ],
            "data": [
                {"source": {"text": "hello"}, "target": "greeting.txt"},
                {"file:///@/./conf/": "settings"}
            ]
        }),
        work,
    );
    assert_eq!(task.code.len(), 2);
    assert_eq!(task.data.len(), 2);

    let mut progress = Recorder::default();
    let summary = Runner::new().run(&task, &mut progress).unwrap();
    assert_eq!((summary.data, summary.code), (2, 2));
    assert_eq!(
        progress.events,
        [
            "start data 0",
            "ok data 0",
            "start data 1",
            "ok data 1",
            "start code 0",
            "ok code 0",
            "start code 1",
            "ok code 1",
        ]
    );
    assert_eq!(
        fs::read_to_string(work.join("log")).unwrap(),
        "hello\nport = 8080\ndone\n"
    );
}

#[test]
fn test_failing_code_stops_the_run() {
    let temp = TempDir::new().unwrap();
    let work = temp.path();
    let task = task(
        json!({
            "cwd": work.display().to_string(),
            "code": [
                {"cmd": ["sh", "-c", "exit 3"], "label": "breaks"},
                ["touch", "second-ran"]
            ]
        }),
        work,
    );

    let mut progress = Recorder::default();
    let err = Runner::new().run(&task, &mut progress).unwrap_err();
    match err {
        Error::EntryFailed { label, cause } => {
            assert_eq!(label, "breaks");
            assert!(matches!(
                cause,
                sourcekit::Error::RunFailed { status: Some(3), .. }
            ));
        }
        other => panic!("Expected Error::EntryFailed, got {other:?}"),
    }
    assert_eq!(progress.events, ["start code 0", "failed code 0"]);
    assert!(!work.join("second-ran").exists());
}

#[test]
fn test_failing_data_prevents_code() {
    let temp = TempDir::new().unwrap();
    let work = temp.path();
    let task = task(
        json!({
            "cwd": work.display().to_string(),
            "data": [{"file:///@/./missing.txt": "copy.txt"}],
            "code": [["touch", "code-ran"]]
        }),
        work,
    );

    let err = Runner::new()
        .run(&task, &mut bundle::NoProgress)
        .unwrap_err();
    assert!(matches!(err, Error::EntryFailed { .. }));
    assert!(!work.join("code-ran").exists());
}

#[test]
fn test_entry_context_stays_in_the_child() {
    let temp = TempDir::new().unwrap();
    let work = temp.path();
    fs::create_dir(work.join("sub")).unwrap();
    let before = std::env::current_dir().unwrap();

    let task = task(
        json!({
            "cwd": work.display().to_string(),
            "env": {"ARX_TASK_VAR": "task"},
            "code": [{
                "cmd": "sh",
                "args": ["-c", "echo \"$ARX_TASK_VAR $ARX_ENTRY_VAR\" > out"],
                "cwd": "sub",
                "env": {"ARX_ENTRY_VAR": "entry"}
            }]
        }),
        work,
    );
    Runner::new().run(&task, &mut bundle::NoProgress).unwrap();

    assert_eq!(
        fs::read_to_string(work.join("sub/out")).unwrap(),
        "task entry\n"
    );
    assert!(std::env::var_os("ARX_TASK_VAR").is_none());
    assert!(std::env::var_os("ARX_ENTRY_VAR").is_none());
    assert_eq!(std::env::current_dir().unwrap(), before);
}

#[test]
fn test_cache_dirs_removed_after_each_entry() {
    let temp = TempDir::new().unwrap();
    let work = temp.path();
    let cache_root = work.join("cache");
    let task = task(
        json!({
            "cwd": work.display().to_string(),
            "data": [{"source": {"text": "x"}, "target": "x.txt"}],
            "code": [
                {"source": {"text": "#!/bin/sh\nls \"$1\" > listing\n"}, "args": [cache_root.display().to_string()]},
                {"source": {"text": "#!/bin/sh\nexit 1\n"}}
            ]
        }),
        work,
    );

    let err = Runner::new()
        .with_cache_root(&cache_root)
        .run(&task, &mut bundle::NoProgress)
        .unwrap_err();
    assert!(matches!(err, Error::EntryFailed { .. }));

    // While the first script ran, exactly its own cache directory existed.
    let listing = fs::read_to_string(work.join("listing")).unwrap();
    assert_eq!(listing.lines().count(), 1);
    assert!(listing.starts_with("arx."));
    assert_eq!(fs::read_dir(&cache_root).unwrap().count(), 0);
}

#[test]
fn test_collection_placed_under_target() {
    let temp = TempDir::new().unwrap();
    let work = temp.path();
    let task = task(
        json!({
            "cwd": work.display().to_string(),
            "data": [{
                "source": {"collection": {"etc": {"motd": "welcome"}, "hosts": ["a", "b"]}},
                "target": "root"
            }]
        }),
        work,
    );
    let summary = Runner::new().run(&task, &mut bundle::NoProgress).unwrap();
    assert_eq!(summary.data, 1);
    assert_eq!(
        fs::read_to_string(work.join("root/etc/motd")).unwrap(),
        "welcome\n"
    );
    assert_eq!(fs::read_to_string(work.join("root/hosts/1")).unwrap(), "b\n");
    assert_eq!(EntryKind::Data.to_string(), "data");
}
