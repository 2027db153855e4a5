//! End-to-end runs of the `source-faker` binary.

use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use shift_sdk::codec::decode_all;
use shift_sdk::types::message::{Message, MessageKind};
use shift_sdk::types::state::State;
use shift_sdk::types::wire::Status;

fn faker(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_source-faker"))
        .args(args)
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to run source-faker")
}

fn messages(output: &Output) -> Vec<Message> {
    decode_all(&output.stdout)
}

fn write_file(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    std::fs::write(&path, contents).unwrap();
    path
}

fn catalog(mode: &str) -> String {
    format!(
        r#"{{"streams":[{{
            "stream":{{"name":"purchases","json_schema":{{}},"supported_sync_modes":["full_refresh","incremental"]}},
            "sync_mode":"{mode}",
            "cursor_field":"id"
        }}]}}"#
    )
}

#[test]
fn spec_needs_no_inputs() {
    let output = faker(&["spec"]);
    assert!(output.status.success());
    let messages = messages(&output);
    let [Message::Spec { spec }] = messages.as_slice() else {
        panic!("expected SPEC, got {messages:?}");
    };
    assert!(spec.supports_incremental);
}

#[test]
fn check_reports_invalid_config_as_failed() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "config.json", r#"{"count": "many"}"#);

    let output = faker(&["check", "--config", config.to_str().unwrap()]);

    assert!(output.status.success());
    let messages = messages(&output);
    let [Message::ConnectionStatus { connection_status }] = messages.as_slice() else {
        panic!("expected CONNECTION_STATUS, got {messages:?}");
    };
    assert_eq!(connection_status.status, Status::Failed);
}

#[test]
fn check_succeeds_with_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "config.json", "{}");

    let output = faker(&["check", "--config", config.to_str().unwrap()]);

    assert!(output.status.success());
    assert!(matches!(
        messages(&output).as_slice(),
        [Message::ConnectionStatus { connection_status }] if connection_status.is_success()
    ));
}

#[test]
fn discover_lists_both_streams() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "config.json", r#"{"count": 3}"#);

    let output = faker(&["discover", "--config", config.to_str().unwrap()]);

    assert!(output.status.success());
    let messages = messages(&output);
    let [Message::Catalog { catalog }] = messages.as_slice() else {
        panic!("expected CATALOG, got {messages:?}");
    };
    let names: Vec<_> = catalog.streams.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["users", "purchases"]);
}

#[test]
fn incremental_read_resumes_from_state() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(
        dir.path(),
        "config.json",
        r#"{"count": 5, "purchases_per_user": 2, "seed": 11}"#,
    );
    let catalog = write_file(dir.path(), "catalog.json", &catalog("incremental"));
    let state = write_file(
        dir.path(),
        "state.json",
        r#"{"streams":[{"stream":{"name":"purchases"},"cursor_field":"id","cursor":4}]}"#,
    );

    let output = faker(&[
        "read",
        "--config",
        config.to_str().unwrap(),
        "--catalog",
        catalog.to_str().unwrap(),
        "--state",
        state.to_str().unwrap(),
        "--batch",
        "3",
    ]);

    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));
    let messages = messages(&output);
    let ids: Vec<_> = messages
        .iter()
        .filter_map(|m| match m {
            Message::Record { record } => record.field("id").and_then(|v| v.as_i64()),
            _ => None,
        })
        .collect();
    assert_eq!(ids, (5..=10).collect::<Vec<_>>());

    let Some(Message::State { state }) = messages.last() else {
        panic!("expected trailing STATE");
    };
    let descriptor = shift_sdk::types::catalog::StreamDescriptor::new("purchases");
    assert_eq!(state.cursor(&descriptor), Some(&serde_json::json!(10)));
}

#[test]
fn full_refresh_read_is_deterministic() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "config.json", r#"{"count": 4, "seed": 99}"#);
    let catalog = write_file(dir.path(), "catalog.json", &catalog("full_refresh"));
    let args = [
        "read",
        "--config",
        config.to_str().unwrap(),
        "--catalog",
        catalog.to_str().unwrap(),
    ];

    let strip = |messages: Vec<Message>| -> Vec<serde_json::Value> {
        messages
            .into_iter()
            .filter_map(|m| match m {
                Message::Record { record } => Some(serde_json::Value::Object(record.data)),
                _ => None,
            })
            .collect()
    };
    let first = strip(messages(&faker(&args)));
    let second = strip(messages(&faker(&args)));
    assert_eq!(first.len(), 8);
    assert_eq!(first, second);
}

#[test]
fn write_is_not_a_driver_command() {
    let output = faker(&["write"]);
    assert_eq!(output.status.code(), Some(1));
    let messages = messages(&output);
    assert!(messages.iter().all(|m| m.kind() != MessageKind::Record));
    assert!(matches!(messages.last(), Some(Message::Trace { .. })));
}

#[test]
fn unknown_command_is_a_usage_error() {
    let output = faker(&["sync"]);
    assert_eq!(output.status.code(), Some(2));
    assert!(output.stdout.is_empty());
}

#[test]
fn empty_state_file_means_fresh_start() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "config.json", r#"{"count": 1}"#);
    let catalog = write_file(dir.path(), "catalog.json", &catalog("incremental"));
    let state = write_file(dir.path(), "state.json", "");

    let output = faker(&[
        "read",
        "--config",
        config.to_str().unwrap(),
        "--catalog",
        catalog.to_str().unwrap(),
        "--state",
        state.to_str().unwrap(),
    ]);

    assert!(output.status.success());
    let messages = messages(&output);
    assert_eq!(
        messages.iter().filter(|m| m.kind() == MessageKind::Record).count(),
        2
    );
    let states: Vec<State> = messages
        .into_iter()
        .filter_map(|m| match m {
            Message::State { state } => Some(state),
            _ => None,
        })
        .collect();
    assert!(!states.is_empty());
}
