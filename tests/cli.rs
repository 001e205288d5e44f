//! Integration tests for top-level CLI behavior.

use std::fs;
use std::path::Path;
use std::process::{Command, Output, Stdio};

use tempfile::TempDir;

fn run_inspector(dir: &Path, args: &[&str]) -> Output {
    let bin = env!("CARGO_BIN_EXE_packages-inspector");
    Command::new(bin)
        .current_dir(dir)
        .env_remove("RUST_LOG")
        .env_remove("PACKAGES_INSPECTOR_SIMILARITY")
        .args(args)
        .stdin(Stdio::null())
        .output()
        .expect("failed to run packages-inspector binary")
}

fn project(files: &[(&str, &str)]) -> TempDir {
    let dir = tempfile::tempdir().unwrap();
    for (name, contents) in files {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, contents).unwrap();
    }
    dir
}

const OFFLINE: &[&str] = &["--no-interaction", "--no-index-lookups"];

fn offline_args<'a>(extra: &[&'a str]) -> Vec<&'a str> {
    let mut args = vec!["."];
    args.extend_from_slice(OFFLINE);
    args.extend_from_slice(extra);
    args
}

#[test]
fn help_shows_usage() {
    let dir = project(&[]);
    let output = run_inspector(dir.path(), &["--help"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success());
    assert!(stdout.contains("--requirements"));
    assert!(stdout.contains("--extra-module"));
}

#[test]
fn clean_project_exits_zero_and_saves_context() {
    let dir = project(&[
        ("app/main.py", "import requests\nfrom yaml import safe_load\nimport os\n"),
        ("requirements.txt", "requests>=2\nPyYAML==6.0\n"),
    ]);

    let output = run_inspector(dir.path(), &offline_args(&["--requirements", "requirements.txt"]));
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0), "{stdout}");
    assert!(stdout.contains("All good"));
    let context = fs::read_to_string(dir.path().join(".packages-inspector.yaml")).unwrap();
    assert!(context.contains("yaml: PyYAML"));
    assert!(context.contains("requests: requests"));
}

#[test]
fn drift_exits_two_unless_disabled() {
    let files = [("main.py", "import requests\n"), ("requirements.txt", "flask\n")];
    let dir = project(&files);

    let output = run_inspector(dir.path(), &offline_args(&["--requirements", "requirements.txt"]));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert_eq!(output.status.code(), Some(2));
    assert!(stdout.contains("Potential missing packages:\n\nrequests"));
    assert!(stdout.contains("Unused packages:\n\nflask"));

    let output = run_inspector(
        dir.path(),
        &offline_args(&["--requirements", "requirements.txt", "--no-error-on-diff"]),
    );
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn corrupt_context_file_is_fatal() {
    let dir =
        project(&[("main.py", "import requests\n"), (".packages-inspector.yaml", "mapping: {}\n")]);

    let output = run_inspector(dir.path(), &offline_args(&[]));
    let stderr = String::from_utf8_lossy(&output.stderr);

    assert_eq!(output.status.code(), Some(1));
    assert!(stderr.contains("invalid context file"));
    let context = fs::read_to_string(dir.path().join(".packages-inspector.yaml")).unwrap();
    assert_eq!(context, "mapping: {}\n");
}

#[test]
fn closed_stdin_aborts_with_130() {
    let dir = project(&[("main.py", "import somethingodd\n")]);

    let output = run_inspector(dir.path(), &[".", "--no-index-lookups"]);

    assert_eq!(output.status.code(), Some(130));
    assert!(!dir.path().join(".packages-inspector.yaml").exists());
}

#[test]
fn apply_rewrites_requirements_file() {
    let dir = project(&[
        ("main.py", "import requests\nimport bs4\n"),
        ("requirements.txt", "# web\nrequests\nsix==1.16\n"),
    ]);

    let args = offline_args(&["--requirements", "requirements.txt", "--apply"]);
    let output = run_inspector(dir.path(), &args);
    assert_eq!(output.status.code(), Some(2));

    let requirements = fs::read_to_string(dir.path().join("requirements.txt")).unwrap();
    assert_eq!(requirements, "# web\nrequests\nbeautifulsoup4\n");

    let output = run_inspector(dir.path(), &offline_args(&["--requirements", "requirements.txt"]));
    assert_eq!(output.status.code(), Some(0));
}

#[test]
fn unreadable_file_is_listed_as_warning() {
    let dir = project(&[("main.py", "import requests\n")]);
    fs::write(dir.path().join("binary.py"), [0xff_u8, 0xfe, 0x00]).unwrap();

    let output = run_inspector(dir.path(), &offline_args(&[]));
    let stdout = String::from_utf8_lossy(&output.stdout);

    assert_eq!(output.status.code(), Some(0));
    assert!(stdout.contains("Warnings:"));
    assert!(stdout.contains("binary.py"));
}

#[test]
fn context_file_option_and_no_update() {
    let dir = project(&[("main.py", "import requests\n")]);

    let output = run_inspector(dir.path(), &offline_args(&["--context-file", "ctx.yaml"]));
    assert!(output.status.success());
    assert!(dir.path().join("ctx.yaml").exists());
    assert!(!dir.path().join(".packages-inspector.yaml").exists());

    fs::remove_file(dir.path().join("ctx.yaml")).unwrap();
    let args = offline_args(&["--context-file", "ctx.yaml", "--no-update-context-file"]);
    let output = run_inspector(dir.path(), &args);
    assert!(output.status.success());
    assert!(!dir.path().join("ctx.yaml").exists());
}
