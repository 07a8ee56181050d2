use crate::app::{connect, execute, run, Invocation};
use crate::args::Args;
use crate::exit::RunExit;
use async_trait::async_trait;
use pretty_assertions::assert_eq;
use serial_test::serial;
use std::env;
use std::fs;
use std::path::Path;
use std::sync::Arc;
use writer_config::constants::{E2B_API_KEY, E2B_WRITER_CONFIG, E2B_WRITER_LOG};
use writer_config::{LogLevel, PipelineConfig, RunMode};
use writer_sandbox::providers::Result;
use writer_sandbox::{CodeExecution, ProviderError, Session, SessionProvider, Workflow};

struct StubProvider {
    fail_create: bool,
}

#[async_trait]
impl SessionProvider for StubProvider {
    async fn create_session(&self) -> Result<Session> {
        if self.fail_create {
            return Err(ProviderError::NetworkError("unreachable".to_string()));
        }
        Ok(Session::new("stub-sandbox"))
    }

    async fn run_code(&self, _session: &Session, _code: &str) -> Result<CodeExecution> {
        Ok(CodeExecution {
            stdout: "ok\n".to_string(),
            stderr: String::new(),
        })
    }

    async fn terminate_session(&self, _session: &Session) -> Result<()> {
        Ok(())
    }
}

fn clear_env() {
    env::remove_var(E2B_API_KEY);
    env::remove_var(E2B_WRITER_CONFIG);
    env::remove_var(E2B_WRITER_LOG);
}

fn write_config(dir: &Path, body: &str) -> std::path::PathBuf {
    let path = dir.join("pipeline.toml");
    fs::write(&path, body).unwrap();
    path
}

fn args_with_config(path: &Path) -> Args {
    Args {
        config: Some(path.to_path_buf()),
        ..Args::default()
    }
}

#[test]
#[serial]
fn test_invocation_defaults_without_config() {
    clear_env();

    let invocation = Invocation::from_args(&Args::default()).unwrap();

    assert_eq!(invocation.mode, RunMode::SelfTest);
    assert_eq!(invocation.logging.level, LogLevel::Info);
    assert!(invocation.logging.echo_output);
    assert!(invocation.pipeline.is_none());
    assert!(matches!(invocation.workflow(), Workflow::SelfTest));
}

#[test]
#[serial]
fn test_invocation_reads_config_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("orders.csv"), "id\n1\n").unwrap();
    let path = write_config(
        dir.path(),
        r#"
mode = "transfer"
log_level = "debug"
staging_dir = "/tmp/staging"

[[tables]]
name = "orders"
path = "orders.csv"
"#,
    );

    let invocation = Invocation::from_args(&args_with_config(&path)).unwrap();

    assert_eq!(invocation.mode, RunMode::Transfer);
    assert_eq!(invocation.logging.level, LogLevel::Debug);
    match invocation.workflow() {
        Workflow::Transfer {
            tables,
            staging_dir,
        } => {
            assert_eq!(staging_dir, "/tmp/staging");
            assert_eq!(tables.len(), 1);
            assert_eq!(tables[0].name, "orders");
            assert_eq!(tables[0].path, dir.path().join("orders.csv"));
        }
        other => panic!("Expected transfer workflow, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_flags_override_config_file() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "mode = \"transfer\"\nlog_level = \"debug\"\n");

    let args = Args {
        mode: Some(RunMode::SelfTest),
        log_level: Some(LogLevel::Warn),
        no_echo: true,
        ..args_with_config(&path)
    };
    let invocation = Invocation::from_args(&args).unwrap();

    assert_eq!(invocation.mode, RunMode::SelfTest);
    assert_eq!(invocation.logging.level, LogLevel::Warn);
    assert!(!invocation.logging.echo_output);
}

#[test]
#[serial]
fn test_transfer_without_config_has_no_tables() {
    clear_env();

    let args = Args {
        mode: Some(RunMode::Transfer),
        ..Args::default()
    };
    let invocation = Invocation::from_args(&args).unwrap();

    match invocation.workflow() {
        Workflow::Transfer {
            tables,
            staging_dir,
        } => {
            assert!(tables.is_empty());
            assert_eq!(staging_dir, "/home/user/data");
        }
        other => panic!("Expected transfer workflow, got {:?}", other),
    }
}

#[test]
#[serial]
fn test_missing_config_file_is_load_failure() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();

    let err = Invocation::from_args(&args_with_config(&dir.path().join("absent.toml")))
        .unwrap_err();
    assert!(err.is_load_failure());
}

#[test]
#[serial]
fn test_connect_without_credential_fails_run() {
    clear_env();

    let result = connect(None);
    assert_eq!(result.err(), Some(RunExit::Failure));
}

#[test]
#[serial]
fn test_connect_exports_config_credential() {
    clear_env();
    let pipeline =
        PipelineConfig::parse("[credentials]\ne2b_api_key = \"e2b_from_config_file\"\n").unwrap();

    let provider = connect(Some(&pipeline));

    assert!(provider.is_ok());
    assert_eq!(
        env::var(E2B_API_KEY).ok().as_deref(),
        Some("e2b_from_config_file")
    );
    clear_env();
}

#[tokio::test]
async fn test_execute_maps_successful_run_to_zero() {
    let invocation = Invocation {
        mode: RunMode::SelfTest,
        logging: Default::default(),
        pipeline: None,
    };

    let exit = execute(invocation, Arc::new(StubProvider { fail_create: false })).await;
    assert_eq!(exit, RunExit::Success);
    assert_eq!(exit.code(), 0);
}

#[tokio::test]
async fn test_execute_maps_acquisition_failure_to_one() {
    let invocation = Invocation {
        mode: RunMode::SelfTest,
        logging: Default::default(),
        pipeline: None,
    };

    let exit = execute(invocation, Arc::new(StubProvider { fail_create: true })).await;
    assert_eq!(exit, RunExit::Failure);
}

#[tokio::test]
#[serial]
async fn test_run_with_absent_config_file_exits_two() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();

    let exit = run(args_with_config(&dir.path().join("absent.toml"))).await;

    assert_eq!(exit, RunExit::ConfigFatal);
    assert_eq!(exit.code(), 2);
}

#[tokio::test]
#[serial]
async fn test_run_with_malformed_config_file_exits_two() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "mode = \"transfer\"\n[[tables]\nname = ");

    let exit = run(args_with_config(&path)).await;

    assert_eq!(exit, RunExit::ConfigFatal);
    assert_eq!(exit.code(), 2);
}

#[tokio::test]
#[serial]
async fn test_run_with_invalid_log_level_in_config_exits_two() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "log_level = \"chatty\"\n");

    let exit = run(args_with_config(&path)).await;

    assert_eq!(exit.code(), 2);
}

#[tokio::test]
#[serial]
async fn test_run_with_invalid_mode_in_config_exits_two() {
    clear_env();
    let dir = tempfile::tempdir().unwrap();
    let path = write_config(dir.path(), "mode = \"upload\"\n");

    let exit = run(args_with_config(&path)).await;

    assert_eq!(exit.code(), 2);
}

#[tokio::test]
#[serial]
async fn test_run_with_invalid_env_log_level_exits_two() {
    clear_env();
    env::set_var(E2B_WRITER_LOG, "shouty");

    let exit = run(Args::default()).await;

    clear_env();
    assert_eq!(exit, RunExit::ConfigFatal);
}
