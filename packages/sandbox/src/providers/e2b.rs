// ABOUTME: E2B provider for secure code-interpreter sandboxes over the E2B REST API
// ABOUTME: Creates and kills sandboxes and runs code through the interpreter's streaming execute endpoint

use super::{CodeExecution, Provider, ProviderError, Result, Session};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::env;
use std::time::Duration;
use tracing::{debug, warn};
use writer_config::constants;

const DEFAULT_API_URL: &str = "https://api.e2b.dev";
const DEFAULT_DOMAIN: &str = "e2b.app";
const DEFAULT_TEMPLATE: &str = "code-interpreter-v1";
const DEFAULT_SANDBOX_TIMEOUT_SECS: u64 = 300;
const INTERPRETER_PORT: u16 = 49999;
const HTTP_TIMEOUT_SECS: u64 = 600;

#[derive(Debug, Serialize)]
struct CreateSandboxRequest<'a> {
    #[serde(rename = "templateID")]
    template_id: &'a str,
    timeout: u64,
}

#[derive(Debug, Deserialize)]
struct CreateSandboxResponse {
    #[serde(rename = "sandboxID")]
    sandbox_id: String,
    #[serde(rename = "clientID", default)]
    client_id: Option<String>,
    #[serde(rename = "envdAccessToken", default)]
    envd_access_token: Option<String>,
}

#[derive(Debug, Serialize)]
struct ExecuteRequest<'a> {
    code: &'a str,
}

/// One line of the interpreter's newline-delimited JSON output
#[derive(Debug, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ExecutionEvent {
    Stdout {
        text: String,
    },
    Stderr {
        text: String,
    },
    Error {
        name: String,
        value: String,
        #[serde(default)]
        traceback: String,
    },
    #[serde(other)]
    Other,
}

/// E2B code-interpreter provider
pub struct E2BProvider {
    http_client: Client,
    api_key: String,
    api_endpoint: String,
    domain: String,
    template: String,
    sandbox_timeout_secs: u64,
    execute_base_url: Option<String>,
}

impl E2BProvider {
    pub fn new(api_key: String, api_endpoint: Option<String>) -> Result<Self> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::ConfigError(
                "E2B API key is required".to_string(),
            ));
        }

        let http_client = Client::builder()
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .build()
            .map_err(|e| ProviderError::ConfigError(e.to_string()))?;

        Ok(Self {
            http_client,
            api_key,
            api_endpoint: api_endpoint
                .unwrap_or_else(|| DEFAULT_API_URL.to_string())
                .trim_end_matches('/')
                .to_string(),
            domain: DEFAULT_DOMAIN.to_string(),
            template: DEFAULT_TEMPLATE.to_string(),
            sandbox_timeout_secs: DEFAULT_SANDBOX_TIMEOUT_SECS,
            execute_base_url: None,
        })
    }

    /// Build from `E2B_API_KEY` plus the optional URL, domain and template overrides
    pub fn from_env() -> Result<Self> {
        let api_key = env::var(constants::E2B_API_KEY).map_err(|_| {
            ProviderError::ConfigError(format!("{} is not set", constants::E2B_API_KEY))
        })?;

        let mut provider = Self::new(api_key, non_empty_var(constants::E2B_API_URL))?;
        if let Some(domain) = non_empty_var(constants::E2B_DOMAIN) {
            provider.domain = domain;
        }
        if let Some(template) = non_empty_var(constants::E2B_TEMPLATE) {
            provider.template = template;
        }
        Ok(provider)
    }

    pub fn with_template(mut self, template: impl Into<String>) -> Self {
        self.template = template.into();
        self
    }

    /// Send execute requests to a fixed base URL instead of the per-sandbox host
    pub fn with_execute_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.execute_base_url = Some(base_url.into().trim_end_matches('/').to_string());
        self
    }

    pub fn template(&self) -> &str {
        &self.template
    }

    fn execute_url(&self, session: &Session) -> String {
        match &self.execute_base_url {
            Some(base) => format!("{}/execute", base),
            None => format!(
                "https://{}-{}.{}/execute",
                INTERPRETER_PORT,
                session.id(),
                self.domain
            ),
        }
    }

    async fn api_error(response: reqwest::Response) -> ProviderError {
        let status = response.status().as_u16();
        let message = response
            .text()
            .await
            .unwrap_or_else(|e| format!("<unreadable body: {}>", e));
        ProviderError::ApiError { status, message }
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    env::var(name)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Fold the interpreter's event stream into captured output.
/// A remote exception turns the whole call into an error.
pub(crate) fn parse_execution_stream(body: &str) -> Result<CodeExecution> {
    let mut execution = CodeExecution::default();

    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let event: ExecutionEvent = serde_json::from_str(line).map_err(|e| {
            ProviderError::InvalidResponse(format!("bad execution event '{}': {}", line, e))
        })?;

        match event {
            ExecutionEvent::Stdout { text } => execution.stdout.push_str(&text),
            ExecutionEvent::Stderr { text } => execution.stderr.push_str(&text),
            ExecutionEvent::Error {
                name,
                value,
                traceback,
            } => {
                return Err(ProviderError::ExecutionError {
                    name,
                    value,
                    traceback,
                    stdout: execution.stdout,
                    stderr: execution.stderr,
                })
            }
            ExecutionEvent::Other => {}
        }
    }

    Ok(execution)
}

#[async_trait]
impl Provider for E2BProvider {
    async fn create_session(&self) -> Result<Session> {
        let url = format!("{}/sandboxes", self.api_endpoint);
        debug!("Creating E2B sandbox from template {}", self.template);

        let response = self
            .http_client
            .post(&url)
            .header("X-API-Key", &self.api_key)
            .json(&CreateSandboxRequest {
                template_id: &self.template,
                timeout: self.sandbox_timeout_secs,
            })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let created: CreateSandboxResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        Ok(Session::new(created.sandbox_id)
            .with_client_id(created.client_id)
            .with_access_token(created.envd_access_token))
    }

    async fn run_code(&self, session: &Session, code: &str) -> Result<CodeExecution> {
        let mut request = self
            .http_client
            .post(self.execute_url(session))
            .json(&ExecuteRequest { code });

        if let Some(token) = session.access_token() {
            request = request.header("X-Access-Token", token);
        }

        let response = request.send().await?;
        if !response.status().is_success() {
            return Err(Self::api_error(response).await);
        }

        let body = response.text().await?;
        parse_execution_stream(&body)
    }

    async fn terminate_session(&self, session: &Session) -> Result<()> {
        let url = format!("{}/sandboxes/{}", self.api_endpoint, session.id());

        let response = self
            .http_client
            .delete(&url)
            .header("X-API-Key", &self.api_key)
            .send()
            .await?;

        match response.status() {
            status if status.is_success() => Ok(()),
            StatusCode::NOT_FOUND => {
                warn!("Sandbox {} was already gone at teardown", session.id());
                Ok(())
            }
            _ => Err(Self::api_error(response).await),
        }
    }
}
