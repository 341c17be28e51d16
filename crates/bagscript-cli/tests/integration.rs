//! Integration tests for the bagscript CLI commands

use std::fs;

use bagscript_bindings::EngineConfig;
use bagscript_cli::{check_command, load_config, run_command};
use tempfile::TempDir;

#[test]
fn test_run_writes_document() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out.pdf");
    let script = dir.path().join("main.rhai");
    fs::write(
        &script,
        format!(
            r#"
            let doc = document::create("{}");
            let page = doc.new_page();
            let rule = node::create("rule");
            rule.width = bag::sp("50pt");
            rule.height = bag::sp("50pt");
            page.output_at(bag::sp("100pt"), bag::sp("500pt"), node::vpack(rule));
            page.shipout();
            doc.finish();
            "#,
            out.display()
        ),
    )
    .unwrap();

    run_command(&script, &EngineConfig::default()).unwrap();
    assert!(fs::read(&out).unwrap().starts_with(b"%PDF-"));
}

#[test]
fn test_run_reports_script_error() {
    let dir = TempDir::new().unwrap();
    let script = dir.path().join("broken.rhai");
    fs::write(&script, r#"let page = document::create().new_page(); page.width = 5;"#).unwrap();

    let err = run_command(&script, &EngineConfig::default()).unwrap_err();
    let message = format!("{:#}", err);
    assert!(message.contains("Failed to run script"));
    assert!(message.contains("ArgumentTypeError"));
}

#[test]
fn test_missing_script() {
    let dir = TempDir::new().unwrap();
    let err = run_command(&dir.path().join("nope.rhai"), &EngineConfig::default()).unwrap_err();
    assert!(err.to_string().contains("Script not found"));
}

#[test]
fn test_check_compiles_only() {
    let dir = TempDir::new().unwrap();
    let good = dir.path().join("good.rhai");
    fs::write(&good, r#"document::create("/nonexistent/dir/out.pdf")"#).unwrap();
    check_command(&good, &EngineConfig::default()).unwrap();

    let bad = dir.path().join("bad.rhai");
    fs::write(&bad, "let = 3;").unwrap();
    let err = check_command(&bad, &EngineConfig::default()).unwrap_err();
    assert!(err.to_string().contains("Failed to compile script"));
}

#[test]
fn test_operation_limit_from_config() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("limits.toml");
    fs::write(&config_path, "[limits]\nmax_operations = 100\n\n[log]\nlevel = \"debug\"\n").unwrap();
    let config = load_config(Some(&config_path)).unwrap();
    assert_eq!(config.limits.max_operations, 100);

    let script = dir.path().join("loop.rhai");
    fs::write(&script, "let x = 0; loop { x += 1; }").unwrap();
    let err = run_command(&script, &config).unwrap_err();
    assert!(format!("{:#}", err).contains("Too many operations"));
}

#[test]
fn test_load_config_errors() {
    let dir = TempDir::new().unwrap();
    assert!(load_config(Some(&dir.path().join("missing.toml"))).is_err());

    let invalid = dir.path().join("invalid.toml");
    fs::write(&invalid, "[limits]\nmax_operations = \"lots\"\n").unwrap();
    let err = load_config(Some(&invalid)).unwrap_err();
    assert!(format!("{:#}", err).contains("Invalid configuration"));
}
