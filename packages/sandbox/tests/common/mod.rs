// ABOUTME: Scripted in-memory provider shared by the sandbox integration tests
// ABOUTME: Records create/run/terminate calls and simulates the remote filesystem for table writes

#![allow(dead_code)]

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use writer_sandbox::providers::Result;
use writer_sandbox::{CodeExecution, ProviderError, Session, SessionProvider};

#[derive(Debug, Default, Clone)]
pub struct ProviderLog {
    pub creates: usize,
    pub terminates: usize,
    pub terminated_ids: Vec<String>,
    /// Every code payload, in call order
    pub runs: Vec<String>,
    /// Simulated remote files: path -> size
    pub files: HashMap<String, usize>,
}

#[derive(Default)]
pub struct ScriptedProvider {
    fail_create: bool,
    fail_terminate: bool,
    failing_runs: HashSet<usize>,
    panic_on_run: Option<usize>,
    stderr: Option<String>,
    misreport_size: bool,
    log: Mutex<ProviderLog>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create(mut self) -> Self {
        self.fail_create = true;
        self
    }

    pub fn failing_terminate(mut self) -> Self {
        self.fail_terminate = true;
        self
    }

    /// Make the n-th `run_code` call (1-based) raise remotely
    pub fn failing_run(mut self, call: usize) -> Self {
        self.failing_runs.insert(call);
        self
    }

    pub fn panicking_run(mut self, call: usize) -> Self {
        self.panic_on_run = Some(call);
        self
    }

    pub fn with_stderr(mut self, stderr: &str) -> Self {
        self.stderr = Some(stderr.to_string());
        self
    }

    /// Report one byte more than was written
    pub fn misreporting_size(mut self) -> Self {
        self.misreport_size = true;
        self
    }

    pub fn log(&self) -> ProviderLog {
        self.log.lock().unwrap().clone()
    }

    fn simulate(&self, code: &str, log: &mut ProviderLog) -> String {
        let path = code
            .lines()
            .find_map(|l| l.strip_prefix("_path = "))
            .and_then(|literal| serde_json::from_str::<String>(literal).ok());

        let payload = code
            .split("b64decode('")
            .nth(1)
            .and_then(|rest| rest.split("')").next())
            .and_then(|b64| STANDARD.decode(b64).ok());

        match (path, payload) {
            (Some(path), Some(bytes)) => {
                let size = bytes.len() + usize::from(self.misreport_size);
                log.files.insert(path, size);
                format!("{}\n", size)
            }
            _ => "ok\n".to_string(),
        }
    }
}

#[async_trait]
impl SessionProvider for ScriptedProvider {
    async fn create_session(&self) -> Result<Session> {
        let mut log = self.log.lock().unwrap();
        log.creates += 1;
        if self.fail_create {
            return Err(ProviderError::ApiError {
                status: 401,
                message: "Invalid API key".to_string(),
            });
        }
        Ok(Session::new(format!("fake-sandbox-{}", log.creates)))
    }

    async fn run_code(&self, _session: &Session, code: &str) -> Result<CodeExecution> {
        let call = {
            let mut log = self.log.lock().unwrap();
            log.runs.push(code.to_string());
            log.runs.len()
        };

        if self.panic_on_run == Some(call) {
            panic!("scripted panic on run {}", call);
        }

        if self.failing_runs.contains(&call) {
            return Err(ProviderError::ExecutionError {
                name: "RuntimeError".to_string(),
                value: format!("scripted failure on run {}", call),
                traceback: "Traceback (most recent call last): ...".to_string(),
                stdout: "partial output\n".to_string(),
                stderr: "about to fail\n".to_string(),
            });
        }

        let mut log = self.log.lock().unwrap();
        let stdout = self.simulate(code, &mut log);
        Ok(CodeExecution {
            stdout,
            stderr: self.stderr.clone().unwrap_or_default(),
        })
    }

    async fn terminate_session(&self, session: &Session) -> Result<()> {
        let mut log = self.log.lock().unwrap();
        log.terminates += 1;
        log.terminated_ids.push(session.id().to_string());
        if self.fail_terminate {
            return Err(ProviderError::NetworkError("connection reset".to_string()));
        }
        Ok(())
    }
}

/// An already-activated session for driving runners directly
pub fn active_session(id: &str) -> Session {
    let mut session = Session::new(id);
    session.activate();
    session
}
