// tests/cli_commands.rs

mod common;
use crate::common::{init_tracing, write_file};

use clap::Parser;

use plugin_sdk::cli::CliArgs;
use plugin_sdk::errors::SdkError;
use plugin_sdk::run;

fn args(argv: &[&str]) -> CliArgs {
    let mut full = vec!["li"];
    full.extend_from_slice(argv);
    CliArgs::try_parse_from(full).unwrap()
}

#[tokio::test]
async fn unknown_command_is_reported_with_exit_code_nine() {
    init_tracing();
    let err = run(args(&["foo"])).await.unwrap_err();

    assert!(matches!(err, SdkError::CommandNotFound(_)));
    assert_eq!(err.to_string(), "Command not found: foo");
    assert_eq!(err.exit_code(), 9);
}

#[tokio::test]
async fn help_and_no_command_succeed_without_configuration() {
    run(args(&[])).await.unwrap();
    run(args(&["help", "--server-config", "/nowhere/server.conf.json"]))
        .await
        .unwrap();
}

#[tokio::test]
async fn missing_server_config_points_at_the_template() {
    let err = run(args(&["build", "--server-config", "/nowhere/server.conf.json"]))
        .await
        .unwrap_err();

    assert!(err.to_string().contains("template.server.conf.json"), "{err}");
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn version_check_without_server_url_fails_with_exit_one() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "server.conf.json", r#"{"pluginToken": "t"}"#);
    let project = dir.path().join("plugin.toml");

    let err = run(args(&[
        "version-check",
        "--server-config",
        config.to_str().unwrap(),
        "--project",
        project.to_str().unwrap(),
    ]))
    .await
    .unwrap_err();

    assert!(err.to_string().contains("A server URL is required"), "{err}");
    assert_eq!(err.exit_code(), 1);
}

#[tokio::test]
async fn malformed_min_version_exits_with_nine() {
    let err = run(args(&[
        "version-check",
        "--use-server-defaults",
        "--min-version",
        "twenty",
    ]))
    .await
    .unwrap_err();

    assert_eq!(
        err.to_string(),
        "Invalid version=twenty. Should be of format <major>.<minor>"
    );
    assert_eq!(err.exit_code(), 9);
}

#[tokio::test]
async fn invalid_plugin_point_stops_before_any_build() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(
        dir.path(),
        "server.conf.json",
        r#"{"serverUrl": "https://stage.example.com", "pluginPoints": ["component", "gadget"]}"#,
    );
    write_file(dir.path(), "res/a.txt", "a");
    let project = dir.path().join("plugin.toml");

    let err = run(args(&[
        "build",
        "--server-config",
        config.to_str().unwrap(),
        "--project",
        project.to_str().unwrap(),
    ]))
    .await
    .unwrap_err();

    assert!(matches!(err, SdkError::InvalidPluginPoint { .. }));
    assert!(!dir.path().join("plugin").exists());
}

#[tokio::test]
async fn build_command_runs_against_the_project_directory() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "res/img/logo.svg", "<svg/>");
    write_file(dir.path(), "web/page.ftl", "<div/>");
    let project = dir.path().join("plugin.toml");

    run(args(&[
        "build",
        "--use-server-defaults",
        "--project",
        project.to_str().unwrap(),
    ]))
    .await
    .unwrap();

    assert!(dir.path().join("plugin/res/img/logo.svg").is_file());
    assert!(dir.path().join("plugin/web/page.ftl").is_file());
}

#[tokio::test]
async fn dry_run_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    write_file(dir.path(), "res/img/logo.svg", "<svg/>");
    let project = dir.path().join("plugin.toml");

    run(args(&[
        "build",
        "--dry-run",
        "--use-server-defaults",
        "--project",
        project.to_str().unwrap(),
    ]))
    .await
    .unwrap();

    assert!(!dir.path().join("plugin").exists());
}

#[tokio::test]
async fn dry_run_from_server_config_applies_without_the_flag() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_file(dir.path(), "server.conf.json", r#"{"dryRun": true, "verbose": true}"#);
    write_file(dir.path(), "res/img/logo.svg", "<svg/>");
    let project = dir.path().join("plugin.toml");

    run(args(&[
        "build",
        "--server-config",
        config.to_str().unwrap(),
        "--project",
        project.to_str().unwrap(),
    ]))
    .await
    .unwrap();

    assert!(!dir.path().join("plugin").exists());
}
