// Integration tests for running command scripts
// Drives the interpreter through the library and the built binary

use std::fs;
use std::io::Write;
use std::path::Path;
use std::process::{Command, Output, Stdio};
use std::sync::Arc;

use tempfile::{tempdir, NamedTempFile};
use textq::interpreter::{Interpreter, Options, Summary};
use textq::queue::FaultInjector;

fn write_script(content: &str) -> NamedTempFile {
    let mut script = NamedTempFile::new().expect("Failed to create script file");
    script.write_all(content.as_bytes()).expect("Failed to write script");
    script
}

/// Run the binary with an empty configuration so local config files are ignored
fn textq(args: &[&str], config_dir: &Path) -> Command {
    let config_path = config_dir.join("empty.toml");
    fs::write(&config_path, "").expect("Failed to write config file");

    let mut command = Command::new(env!("CARGO_BIN_EXE_textq"));
    command.args(args).env("TEXTQ_CONFIG", &config_path);
    command
}

fn run_textq(args: &[&str]) -> Output {
    let dir = tempdir().expect("Failed to create temp directory");
    textq(args, dir.path()).output().expect("Failed to run textq")
}

fn run_library(script: &str, allocator: FaultInjector) -> (Summary, String) {
    let mut interpreter = Interpreter::new(Options::default(), Arc::new(allocator), Vec::new());
    let summary = interpreter.run(script.as_bytes()).expect("Script should run");
    (summary, String::from_utf8(interpreter.into_output()).unwrap())
}

#[test]
fn test_script_success_exit_code() {
    let script = write_script("new\nit b\nih a\nshow\nrh a\nrh b\nfree\n");

    let output = run_textq(&[script.path().to_str().unwrap()]);

    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(output.status.success(), "stdout: {}\nstderr: {}", stdout, String::from_utf8_lossy(&output.stderr));
    assert!(stdout.contains("q = [a b]"));
    assert!(stdout.contains("Removed a from queue"));
}

#[test]
fn test_script_errors_exit_code() {
    let script = write_script("new\nit apple\nrh banana\n");

    let output = run_textq(&[script.path().to_str().unwrap()]);

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("ERROR: Removed value 'apple' does not match requested 'banana'"));
}

#[test]
fn test_script_from_stdin() {
    let dir = tempdir().unwrap();
    let mut child = textq(&["--echo"], dir.path())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to spawn textq");

    child
        .stdin
        .take()
        .unwrap()
        .write_all(b"new\nit zebra\nit aardvark\nsort\nshow\nquit\n")
        .unwrap();
    let output = child.wait_with_output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cmd> sort"));
    assert!(stdout.contains("q = [aardvark zebra]"));
}

#[test]
fn test_fault_injection_flags() {
    let script = write_script("new\n");

    let output = run_textq(&["--fail-percent", "100", script.path().to_str().unwrap()]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Allocation failure tolerated"));
}

#[test]
fn test_memory_limit_flag() {
    let script = write_script("new\nit averyveryverylongvaluethatwillnotfit\n");

    let output = run_textq(&["--memory-limit", "64", script.path().to_str().unwrap()]);

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Allocation failure tolerated"));
}

#[test]
fn test_invalid_arguments() {
    let output = run_textq(&["--verbose", "--quiet"]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Conflicting log level flags"));

    let output = run_textq(&["--fail-percent", "200"]);
    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn test_missing_script() {
    let output = run_textq(&["/definitely/does/not/exist.cmd"]);

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("Failed to open script"));
}

#[test]
fn test_json_file_logging() {
    let dir = tempdir().unwrap();
    let log_path = dir.path().join("textq.log");
    let script = write_script("new\nit a\nrh b\n");

    let output = textq(
        &[
            "--log-format",
            "json",
            "--log-file",
            log_path.to_str().unwrap(),
            "--log-file-level",
            "debug",
            script.path().to_str().unwrap(),
        ],
        dir.path(),
    )
    .output()
    .unwrap();

    assert_eq!(output.status.code(), Some(1));
    let log = fs::read_to_string(&log_path).expect("Log file should be written");
    assert!(log.lines().all(|line| line.starts_with('{')));
    assert!(log.contains(r#""level":"DEBUG""#));
    assert!(log.contains(r#""level":"WARN""#));
}

#[test]
fn test_seeded_runs_are_reproducible() {
    let script = "new\nit a 50\nih b 50\nsort\nreverse\nsize\nfree\n";

    let (first, first_output) = run_library(script, FaultInjector::new(usize::MAX, 30, 7));
    let (second, second_output) = run_library(script, FaultInjector::new(usize::MAX, 30, 7));

    assert_eq!(first, second);
    assert_eq!(first_output, second_output);
    assert!(first.allocation_failures > 0);
    assert_eq!(first.leaked_blocks, 0);
}

#[test]
fn test_heavy_fault_injection_keeps_queue_consistent() {
    let mut script = String::from("new\noption fail 100000\n");
    for i in 0..200 {
        script.push_str(&format!("ih h{} \nit t{}\n", i, i));
        if i % 7 == 0 {
            script.push_str("rhq\nreverse\n");
        }
        if i % 31 == 0 {
            script.push_str("sort\nsize\n");
        }
    }
    script.push_str("free\n");

    let (summary, output) = run_library(&script, FaultInjector::new(usize::MAX, 40, 2024));

    assert_eq!(summary.errors, 0, "{}", output);
    assert!(summary.allocation_failures > 0);
    assert_eq!(summary.leaked_blocks, 0);
}
