use std::process::{Command, Output};

fn aiterm(args: &[&str]) -> (Output, tempfile::TempDir) {
    let logs = tempfile::tempdir().expect("temp logs dir");
    let output = Command::new(env!("CARGO_BIN_EXE_aiterm"))
        .arg("--logs-dir")
        .arg(logs.path())
        .args(args)
        .env_remove("RUST_LOG")
        .output()
        .expect("run aiterm");
    (output, logs)
}

fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{addr}")
}

#[test]
fn help_lists_subcommands() {
    let (out, _logs) = aiterm(&["--help"]);
    assert!(out.status.success());
    let text = String::from_utf8_lossy(&out.stdout);
    for sub in ["exec", "health", "history", "search"] {
        assert!(text.contains(sub), "missing {sub} in help:\n{text}");
    }
}

#[test]
fn rejects_unknown_executor() {
    let (out, _logs) = aiterm(&["--executor", "zsh", "health"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("unknown executor"));
}

#[test]
fn unreachable_backend_fails_with_context_and_writes_log() {
    let url = closed_port_url();
    let (out, logs) = aiterm(&["--api-url", &url, "health"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("health check failed"));

    let wrote_log = std::fs::read_dir(logs.path())
        .unwrap()
        .filter_map(Result::ok)
        .any(|e| e.file_name().to_string_lossy().starts_with("aiterm.cli."));
    assert!(wrote_log);
}

#[test]
fn exec_against_unreachable_backend_reports_error() {
    let url = closed_port_url();
    let (out, _logs) = aiterm(&["--api-url", &url, "exec", "list", "files"]);
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("Cannot reach the backend"));
}
