//! CLI Integration Tests (Blackbox)
//!
//! These tests drive the `sehat` binary through its public interface:
//! arguments, stdin/stdout and exit codes. The `unsupported` engine is
//! used wherever recognition would run, so no OCR backend is required.

use serde_json::{json, Value};
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use tempfile::TempDir;

/// Run the binary isolated from any user configuration
fn sehat(home: &Path) -> Command {
    let mut command = Command::new(env!("CARGO_BIN_EXE_sehat"));
    command
        .current_dir(home)
        .env("HOME", home)
        .env("XDG_CONFIG_HOME", home.join(".config"))
        .env("XDG_CACHE_HOME", home.join(".cache"))
        .env_remove("RUST_LOG");
    command
}

fn serve(home: &Path, input: &str) -> Output {
    let mut child = sehat(home)
        .args(["serve", "--engine", "unsupported"])
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn sehat serve");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(input.as_bytes())
        .unwrap();

    child.wait_with_output().unwrap()
}

#[test]
fn test_help_flag_produces_output() {
    let home = TempDir::new().unwrap();
    let output = sehat(home.path()).arg("--help").output().unwrap();

    assert!(output.status.success(), "sehat --help should exit successfully");
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Usage:"));
    assert!(stdout.contains("extract"));
    assert!(stdout.contains("serve"));
}

#[test]
fn test_extract_missing_image_fails() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("doc.png");

    let output = sehat(home.path())
        .arg("extract")
        .arg(&missing)
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("not_found"), "stderr: {}", stderr);
}

#[test]
fn test_extract_json_reports_typed_error() {
    let home = TempDir::new().unwrap();
    let missing = home.path().join("doc.png");

    let output = sehat(home.path())
        .arg("extract")
        .arg(&missing)
        .arg("--json")
        .output()
        .unwrap();

    assert!(output.status.success());
    let reply: Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(
        reply,
        json!({
            "id": null,
            "error": {
                "code": "not_found",
                "message": "Image not found",
                "details": missing.to_string_lossy()
            }
        })
    );
}

#[test]
fn test_serve_replies_once_per_request_line() {
    let home = TempDir::new().unwrap();
    let image = home.path().join("scan.png");
    std::fs::write(&image, b"png").unwrap();

    let input = [
        json!({"id": 1, "method": "extractText", "args": {"imagePath": image}}),
        json!({"id": 2, "method": "isDoNotDisturbEnabled"}),
        json!({"id": 3, "method": "extractText", "args": {"imagePath": 12}}),
    ]
    .iter()
    .map(|v| format!("{}\n", v))
    .collect::<String>();

    let output = serve(home.path(), &input);
    assert!(output.status.success(), "stderr: {}", String::from_utf8_lossy(&output.stderr));

    let mut replies: Vec<Value> = String::from_utf8_lossy(&output.stdout)
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    replies.sort_by_key(|reply| reply["id"].as_u64());

    assert_eq!(replies.len(), 3);
    assert_eq!(
        replies[0],
        json!({"id": 1, "error": {"code": "vision_error", "message": "OCR not implemented for this platform"}})
    );
    assert_eq!(replies[1]["error"]["code"], "method_not_implemented");
    assert_eq!(replies[2]["error"]["code"], "bad_args");
}

#[test]
fn test_info_shows_channel_name() {
    let home = TempDir::new().unwrap();
    let output = sehat(home.path())
        .args(["info", "--engine", "tesseract"])
        .output()
        .unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("com.sehatlocker/apple_vision_ocr"));
    assert!(stdout.contains("tesseract"));
}

#[test]
fn test_config_file_in_working_directory_is_used() {
    let home = TempDir::new().unwrap();
    std::fs::write(
        home.path().join("sehat.toml"),
        "[channel]\nname = \"com.example/ocr\"\n",
    )
    .unwrap();

    let output = sehat(home.path()).arg("info").output().unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("com.example/ocr"));
}
