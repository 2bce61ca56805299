//! Exit codes and output of the `portgate` binary.

use std::net::TcpListener;
use std::process::{Command, Output};

fn portgate(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_portgate"))
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run portgate")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).into_owned()
}

/// A loopback port with nothing listening on it.
fn closed_port() -> u16 {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    listener.local_addr().unwrap().port()
}

#[test]
fn wrong_argument_count_exits_1() {
    assert_eq!(portgate(&[]).status.code(), Some(1));
    assert_eq!(portgate(&["127.0.0.1"]).status.code(), Some(1));
}

#[test]
fn help_exits_0() {
    assert_eq!(portgate(&["--help"]).status.code(), Some(0));
}

#[test]
fn unauthorized_host_exits_1() {
    let output = portgate(&["evil.com", "80"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(stdout(&output).contains("SECURITY VIOLATION"));
}

#[test]
fn invalid_port_spec_exits_1() {
    for spec in ["abc", "70000", "100-50"] {
        let output = portgate(&["127.0.0.1", spec]);
        assert_eq!(output.status.code(), Some(1), "{spec}");
        assert!(stdout(&output).contains("ERROR:"), "{spec}");
    }
}

#[test]
fn closed_port_scan_exits_0() {
    let port = closed_port().to_string();
    let range = format!("{port}-{port}");
    let output = portgate(&["127.0.0.1", &range]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains("Scanning Target: 127.0.0.1 (127.0.0.1)"));
    assert!(text.contains(&format!("Port {port}: CLOSED")));
    assert!(text.contains("No open ports found"));
    assert_eq!(text.matches("Port ").count(), 1);
}

#[test]
fn open_port_listed_in_summary() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port().to_string();
    let output = portgate(&["localhost", &port, "--pacing-ms", "0"]);

    assert_eq!(output.status.code(), Some(0));
    let text = stdout(&output);
    assert!(text.contains(&format!("Port {port}: OPEN")));
    assert!(text.contains(&format!("Open Ports found: {port}")));
}

#[test]
fn json_report() {
    let port = closed_port();
    let output = portgate(&["127.0.0.1", &port.to_string(), "--format", "json"]);

    assert_eq!(output.status.code(), Some(0));
    let value: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(value["results"][0]["port"], port);
    assert_eq!(value["results"][0]["verdict"], "CLOSED");
}
