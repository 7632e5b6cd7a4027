//! CLI integration tests
//!
//! The binary always prints a result object on stdout and exits non-zero when
//! the result is a failure.

use assert_cmd::Command;
use mockito::{Matcher, Server};
use predicates::prelude::*;
use serde_json::Value;

fn allclient() -> Command {
    let mut cmd = Command::cargo_bin("allclient").expect("binary should build");
    // Keep a developer's config file out of the tests.
    cmd.env("ALLCLIENT_CONFIG", "/nonexistent/allclient/config.toml");
    cmd
}

fn stdout_json(output: &std::process::Output) -> Value {
    serde_json::from_slice(&output.stdout).expect("stdout should be valid JSON")
}

#[test]
fn list_prints_advertised_procedures() {
    let mut server = Server::new();
    let _introspect = server
        .mock("POST", "/introspect")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"code":"OK","message":"","procedures":"{\"sayHello\":\"function\"}"}"#)
        .create();

    let output = allclient()
        .arg(server.url())
        .arg("list")
        .assert()
        .success()
        .get_output()
        .clone();

    let json = stdout_json(&output);
    assert_eq!(json["success"], true);
    assert_eq!(json["procedures"], serde_json::json!(["sayHello"]));
}

#[test]
fn call_passes_json_argument() {
    let mut server = Server::new();
    let _call = server
        .mock("POST", "/add")
        .match_body(Matcher::Json(serde_json::json!({"a": 1, "b": 2})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"code":"OK","message":"","sum":3}"#)
        .create();

    let output = allclient()
        .arg(server.url())
        .arg("--no-introspect")
        .arg("call")
        .arg("add")
        .arg("--json")
        .arg(r#"{"a":1,"b":2}"#)
        .assert()
        .success()
        .get_output()
        .clone();

    let json = stdout_json(&output);
    assert_eq!(json["sum"], 3);
}

#[test]
fn unreachable_call_exits_with_failure_result() {
    let output = allclient()
        .arg("http://127.0.0.1:9")
        .arg("call")
        .arg("foo")
        .assert()
        .failure()
        .stdout(predicate::str::contains("ALLSERVER_PROCEDURE_UNREACHABLE"))
        .get_output()
        .clone();

    let json = stdout_json(&output);
    assert_eq!(json["success"], false);
    assert_eq!(json["message"], "Couldn't reach remote procedure: foo");
}

#[test]
fn unsupported_scheme_is_reported() {
    allclient()
        .arg("ftp://files.example.com")
        .arg("list")
        .assert()
        .failure()
        .stdout(predicate::str::contains("UNSUPPORTED_SCHEME"));
}

#[test]
fn invalid_json_argument_is_reported() {
    allclient()
        .arg("http://127.0.0.1:9")
        .arg("--no-introspect")
        .arg("call")
        .arg("foo")
        .arg("--json")
        .arg("{nope")
        .assert()
        .failure()
        .stdout(predicate::str::contains("INVALID_ARGUMENT"));
}

#[test]
fn verbose_reports_cache_statistics() {
    let mut server = Server::new();
    let _introspect = server
        .mock("POST", "/introspect")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"success":true,"code":"OK","message":"","procedures":"{\"ping\":\"function\"}"}"#)
        .create();

    allclient()
        .arg(server.url())
        .arg("--verbose")
        .arg("list")
        .assert()
        .success()
        .stderr(predicate::str::contains("Introspection cache:"))
        .stderr(predicate::str::contains("Fetches: 1"));
}
