// Integration tests for configuration file handling
// Covers discovery via TEXTQ_CONFIG, section selection and flag precedence

use std::fs;
use std::path::Path;
use std::process::{Command, Output};

use tempfile::tempdir;
use textq::config::ConfigManager;

fn run_with_config(config_content: &str, extra_args: &[&str], script: &str) -> Output {
    let temp_dir = tempdir().expect("Failed to create temp directory");
    let config_path = temp_dir.path().join("textq.toml");
    let script_path = temp_dir.path().join("script.cmd");
    fs::write(&config_path, config_content).expect("Failed to write config file");
    fs::write(&script_path, script).expect("Failed to write script");

    run_textq(&config_path, extra_args, &script_path)
}

fn run_textq(config_path: &Path, extra_args: &[&str], script_path: &Path) -> Output {
    Command::new(env!("CARGO_BIN_EXE_textq"))
        .env("TEXTQ_CONFIG", config_path)
        .args(extra_args)
        .arg(script_path)
        .output()
        .expect("Failed to execute textq")
}

#[test]
fn test_config_discovered_from_environment() {
    let output = run_with_config("[interpreter]\necho = true\n", &[], "new\nshow\n");

    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("cmd> new"));
    assert!(stdout.contains("cmd> show"));
}

#[test]
fn test_explicit_config_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("explicit.toml");
    let script_path = temp_dir.path().join("script.cmd");
    fs::write(&config_path, "[interpreter]\nbuffer-length = 3\n").unwrap();
    fs::write(&script_path, "new\nit abcdef\nrh\n").unwrap();

    let output = Command::new(env!("CARGO_BIN_EXE_textq"))
        .env("TEXTQ_CONFIG", temp_dir.path().join("missing.toml"))
        .arg("--config-file")
        .arg(&config_path)
        .arg(&script_path)
        .output()
        .unwrap();

    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Removed ab from queue"));
}

#[test]
fn test_config_section_selection() {
    let config = r#"
[allocator]
fail-percent = 0

[stress]
fail-percent = 100
"#;

    let plain = run_with_config(config, &[], "new\n");
    assert!(!String::from_utf8_lossy(&plain.stdout).contains("Allocation failure"));

    let stressed = run_with_config(config, &["--config-name", "stress"], "new\n");
    assert!(String::from_utf8_lossy(&stressed.stdout).contains("Allocation failure tolerated"));
}

#[test]
fn test_flags_override_config() {
    let config = r#"
[allocator]
fail-percent = 100

[interpreter]
error-limit = 1
"#;

    let output = run_with_config(
        config,
        &["--fail-percent", "0", "--error-limit", "3"],
        "bogus\nnew\nit kept\nshow\n",
    );

    assert_eq!(output.status.code(), Some(1));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("q = [kept]"));
    assert!(!stdout.contains("Allocation failure"));
}

#[test]
fn test_invalid_config_rejected() {
    let output = run_with_config("[allocator]\nmemory-limit = \"lots\"\n", &[], "new\n");

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("memory-limit"));

    let output = run_with_config("this is = = not toml", &[], "new\n");
    assert_eq!(output.status.code(), Some(1));
}

#[test]
fn test_config_manager_from_file() {
    let temp_dir = tempdir().unwrap();
    let config_path = temp_dir.path().join("textq.toml");
    fs::write(
        &config_path,
        r#"
[base]
console-level = "debug"
log-format = "json"

[allocator]
preset = "fault-injecting"
seed = 11

[interpreter]
fail-limit = 4
"#,
    )
    .unwrap();

    let manager = ConfigManager::load_from_file(config_path).unwrap();

    assert_eq!(manager.get_log_level("base", "console-level").unwrap(), Some(log::LevelFilter::Debug));
    let allocator = manager.get_allocator_config().unwrap();
    assert_eq!(allocator.fail_percent, 10);
    assert_eq!(allocator.seed, 11);
    assert_eq!(manager.get_interpreter_options().unwrap().fail_limit, 4);
}
