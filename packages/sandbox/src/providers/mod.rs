// ABOUTME: Provider trait and session types for remote code-execution backends
// ABOUTME: Defines the narrow create / run code / terminate contract the orchestrator consumes

use async_trait::async_trait;
use thiserror::Error;

pub mod e2b;

pub use e2b::E2BProvider;

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    #[error("Remote execution raised {name}: {value}")]
    ExecutionError {
        name: String,
        value: String,
        traceback: String,
        /// Output streamed before the exception
        stdout: String,
        stderr: String,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl ProviderError {
    /// Stable error type label used in failure reports
    pub fn kind(&self) -> &'static str {
        match self {
            ProviderError::ConfigError(_) => "config_error",
            ProviderError::NetworkError(_) => "network_error",
            ProviderError::ApiError { .. } => "api_error",
            ProviderError::ExecutionError { .. } => "execution_error",
            ProviderError::InvalidResponse(_) => "invalid_response",
        }
    }
}

impl From<reqwest::Error> for ProviderError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkError(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Uninitialized,
    Active,
    Terminated,
}

/// Handle to one remote execution context
#[derive(Debug)]
pub struct Session {
    id: String,
    client_id: Option<String>,
    access_token: Option<String>,
    state: SessionState,
}

impl Session {
    /// A session as returned by a provider; the owner activates it
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            client_id: None,
            access_token: None,
            state: SessionState::Uninitialized,
        }
    }

    pub fn with_client_id(mut self, client_id: Option<String>) -> Self {
        self.client_id = client_id;
        self
    }

    pub fn with_access_token(mut self, access_token: Option<String>) -> Self {
        self.access_token = access_token;
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }

    pub fn access_token(&self) -> Option<&str> {
        self.access_token.as_deref()
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn activate(&mut self) {
        if self.state == SessionState::Uninitialized {
            self.state = SessionState::Active;
        }
    }

    pub fn mark_terminated(&mut self) {
        self.state = SessionState::Terminated;
    }
}

/// Captured output of one remote code execution
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeExecution {
    pub stdout: String,
    pub stderr: String,
}

/// Remote execution backend
#[async_trait]
pub trait Provider: Send + Sync {
    /// Create a new remote session
    async fn create_session(&self) -> Result<Session>;

    /// Run a code payload in the session and capture its output.
    /// Errors on transport failure or when the code raises remotely.
    async fn run_code(&self, session: &Session, code: &str) -> Result<CodeExecution>;

    /// Release the remote session
    async fn terminate_session(&self, session: &Session) -> Result<()>;
}
