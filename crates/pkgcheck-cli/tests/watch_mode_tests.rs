use std::fs;
use std::process::{Command, Stdio};
use std::thread;
use std::time::Duration;
use tempfile::TempDir;

/// Watch mode prints its banner and runs the initial check
#[test]
fn test_watch_mode_starts() {
    let temp_dir = TempDir::new().unwrap();
    let input_file = temp_dir.path().join("main.mini");
    fs::write(&input_file, "package main\nvar x = nowhere\n").unwrap();

    let mut child = Command::new(assert_cmd::cargo::cargo_bin!("pkgcheck"))
        .current_dir(temp_dir.path())
        .arg(&input_file)
        .arg("--watch")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start watch mode");

    thread::sleep(Duration::from_millis(500));

    child.kill().expect("Failed to kill watch process");
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert!(stdout.contains("Watching for changes"));
    assert!(stdout.contains("undeclared name: nowhere"));
}

/// Editing a package file triggers another check
#[test]
fn test_watch_mode_rechecks_on_change() {
    let temp_dir = TempDir::new().unwrap();
    let input_file = temp_dir.path().join("main.mini");
    fs::write(&input_file, "package main\nvar x = 1\n").unwrap();

    let mut child = Command::new(assert_cmd::cargo::cargo_bin!("pkgcheck"))
        .current_dir(temp_dir.path())
        .arg(&input_file)
        .arg("--watch")
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start watch mode");

    thread::sleep(Duration::from_millis(800));
    fs::write(&input_file, "package main\nvar x = changed\n").unwrap();
    thread::sleep(Duration::from_millis(1500));

    child.kill().expect("Failed to kill watch process");
    let output = child.wait_with_output().unwrap();
    let stdout = String::from_utf8_lossy(&output.stdout);

    // Change detection depends on the platform watcher; only check it when it fired
    if stdout.contains("re-checking") {
        assert!(stdout.contains("undeclared name: changed"));
    }
}
