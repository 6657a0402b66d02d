//! Integration tests for the `kix` binary's offline surface.

use std::fs;
use std::path::PathBuf;
use std::process::Command;

use tempfile::TempDir;

fn kix_binary() -> PathBuf {
    let mut path = std::env::current_exe().unwrap();
    path.pop(); // remove test binary name
    path.pop(); // remove deps/
    path.push("kix");
    path
}

fn write_batch(dir: &TempDir) -> PathBuf {
    let file = dir.path().join("batch.json");
    fs::write(
        &file,
        r#"[
            {
                "_id": "result123",
                "user_id": "userXYZ",
                "folder_id": "folderABC",
                "document_id": "doc789",
                "timestamp": "2025-04-15T10:00:00Z",
                "fieldValues": [
                    { "fieldType": "text", "fieldName": "FirstName", "value": "Alice" },
                    { "fieldType": "checkbox", "fieldName": "NewsletterOpt", "value": true }
                ]
            }
        ]"#,
    )
    .unwrap();
    file
}

#[test]
fn flatten_prints_embeddable_text() {
    let tmp = TempDir::new().unwrap();
    let batch = write_batch(&tmp);

    let output = Command::new(kix_binary())
        .current_dir(tmp.path())
        .arg("flatten")
        .arg(&batch)
        .output()
        .unwrap();

    assert!(output.status.success(), "flatten failed: {:?}", output);
    let stdout = String::from_utf8(output.stdout).unwrap();
    assert!(stdout.contains("Submission (Result ID: result123)"));
    assert!(stdout.contains("FirstName: Alice"));
    assert!(stdout.contains("NewsletterOpt: Checked"));
}

#[test]
fn flatten_is_deterministic_across_runs() {
    let tmp = TempDir::new().unwrap();
    let batch = write_batch(&tmp);

    let run = || {
        let output = Command::new(kix_binary())
            .current_dir(tmp.path())
            .arg("flatten")
            .arg(&batch)
            .output()
            .unwrap();
        assert!(output.status.success());
        String::from_utf8(output.stdout).unwrap()
    };

    assert_eq!(run(), run());
}

#[test]
fn missing_configuration_exits_nonzero() {
    let tmp = TempDir::new().unwrap();

    // No env file in the sandbox and a cleared environment: config load
    // must fail before any remote call is attempted.
    let output = Command::new(kix_binary())
        .current_dir(tmp.path())
        .env_clear()
        .arg("delete-index")
        .output()
        .unwrap();

    assert!(!output.status.success());
    let stderr = String::from_utf8(output.stderr).unwrap();
    assert!(stderr.contains("SEARCH_ENDPOINT"), "stderr: {}", stderr);
}

#[test]
fn flatten_rejects_invalid_batch() {
    let tmp = TempDir::new().unwrap();
    let file = tmp.path().join("bad.json");
    fs::write(&file, "42").unwrap();

    let output = Command::new(kix_binary())
        .current_dir(tmp.path())
        .arg("flatten")
        .arg(&file)
        .output()
        .unwrap();

    assert!(!output.status.success());
}
