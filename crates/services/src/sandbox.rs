//! Sandbox backends for the dev environment.
//!
//! [`RemoteSandboxClient`] talks to a hosted sandbox API over HTTPS;
//! [`LocalSimulation`] fakes every call and is used as the fallback when the
//! remote service cannot be reached.

use async_trait::async_trait;
use chrono::Utc;
use reqwest::multipart::{Form, Part};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use shared::settings::SandboxSettings;
use std::env;
use std::error::Error as _;
use std::time::Duration;
use tracing::{debug, info};

/// Environment variable consulted when the settings carry no sandbox key
pub const SANDBOX_KEY_ENV: &str = "ARTIFACT_STUDIO_SANDBOX_KEY";

const WORKSPACE_ROOT: &str = "/workspace";

#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    #[error("Remote sandbox client is not configured")]
    NotConfigured,

    #[error("TLS error talking to sandbox API: {0}")]
    Tls(String),

    #[error("Cannot reach sandbox API: {0}")]
    Connection(String),

    #[error("Sandbox API error: {status} - {message}")]
    Api { status: u16, message: String },

    #[error("Invalid sandbox API response: {0}")]
    InvalidResponse(String),
}

impl SandboxError {
    /// True for certificate / network failures where the sandbox host was
    /// never reached. Used for log wording only; any provisioning error
    /// falls back to local simulation.
    pub fn is_connectivity(&self) -> bool {
        matches!(self, SandboxError::Tls(_) | SandboxError::Connection(_))
    }

    fn from_transport(err: reqwest::Error) -> Self {
        let mut detail = err.to_string();
        let mut source = err.source();
        while let Some(inner) = source {
            detail.push_str(": ");
            detail.push_str(&inner.to_string());
            source = inner.source();
        }

        let lower = detail.to_lowercase();
        if ["certificate", "tls", "ssl", "handshake"]
            .iter()
            .any(|w| lower.contains(w))
        {
            SandboxError::Tls(detail)
        } else if err.is_decode() {
            SandboxError::InvalidResponse(detail)
        } else {
            SandboxError::Connection(detail)
        }
    }
}

/// Reference to a provisioned sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SandboxHandle {
    pub id: String,
}

/// Result of a command run inside a sandbox
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutput {
    pub exit_code: i32,
    pub output: String,
}

impl ExecOutput {
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }
}

#[async_trait]
pub trait SandboxProvider: Send + Sync {
    async fn create(&self, image: &str, public: bool) -> Result<SandboxHandle, SandboxError>;

    async fn exec(
        &self,
        handle: &SandboxHandle,
        command: &str,
        cwd: Option<&str>,
    ) -> Result<ExecOutput, SandboxError>;

    async fn upload_file(
        &self,
        handle: &SandboxHandle,
        bytes: Vec<u8>,
        path: &str,
    ) -> Result<(), SandboxError>;

    async fn preview_link(&self, handle: &SandboxHandle, port: u16)
        -> Result<String, SandboxError>;

    async fn delete(&self, handle: &SandboxHandle) -> Result<(), SandboxError>;

    /// Home directory inside the sandbox
    fn root_dir(&self, handle: &SandboxHandle) -> String;
}

// ── Remote ───────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct CreateRequest<'a> {
    image: &'a str,
    public: bool,
}

#[derive(Debug, Deserialize)]
struct CreateResponse {
    id: String,
}

#[derive(Debug, Serialize)]
struct ExecRequest<'a> {
    command: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    cwd: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct ExecResponse {
    #[serde(default)]
    output: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PreviewResponse {
    Object { url: String },
    Plain(String),
}

/// HTTP client for the hosted sandbox API
pub struct RemoteSandboxClient {
    http: Client,
    api_url: String,
    api_key: String,
}

impl RemoteSandboxClient {
    pub fn new(api_url: &str, api_key: &str, timeout: Duration) -> Result<Self, SandboxError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| SandboxError::Connection(e.to_string()))?;
        Ok(Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Build from settings, falling back to [`SANDBOX_KEY_ENV`] for the key.
    pub fn from_settings(settings: &SandboxSettings) -> Result<Self, SandboxError> {
        let key = settings
            .api_key
            .clone()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| env::var(SANDBOX_KEY_ENV).ok())
            .ok_or(SandboxError::NotConfigured)?;
        Self::new(
            &settings.api_url,
            &key,
            Duration::from_secs(settings.command_timeout_secs),
        )
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.api_url, path)
    }

    fn bearer(&self) -> String {
        format!("Bearer {}", self.api_key)
    }

    async fn check(resp: reqwest::Response) -> Result<reqwest::Response, SandboxError> {
        if resp.status().is_success() {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        Err(SandboxError::Api {
            status,
            message: body.chars().take(400).collect(),
        })
    }
}

#[async_trait]
impl SandboxProvider for RemoteSandboxClient {
    async fn create(&self, image: &str, public: bool) -> Result<SandboxHandle, SandboxError> {
        let resp = self
            .http
            .post(self.url("/sandboxes"))
            .header("Authorization", self.bearer())
            .json(&CreateRequest { image, public })
            .send()
            .await
            .map_err(SandboxError::from_transport)?;
        let created: CreateResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(SandboxError::from_transport)?;
        info!(id = %created.id, "sandbox created");
        Ok(SandboxHandle { id: created.id })
    }

    async fn exec(
        &self,
        handle: &SandboxHandle,
        command: &str,
        cwd: Option<&str>,
    ) -> Result<ExecOutput, SandboxError> {
        debug!(id = %handle.id, command, "remote exec");
        let resp = self
            .http
            .post(self.url(&format!("/sandboxes/{}/exec", handle.id)))
            .header("Authorization", self.bearer())
            .json(&ExecRequest { command, cwd })
            .send()
            .await
            .map_err(SandboxError::from_transport)?;

        if !resp.status().is_success() {
            let reason = resp
                .status()
                .canonical_reason()
                .unwrap_or("unknown status")
                .to_string();
            return Ok(ExecOutput {
                exit_code: 1,
                output: format!("Command failed: {}", reason),
            });
        }

        let body: ExecResponse = resp.json().await.map_err(SandboxError::from_transport)?;
        Ok(ExecOutput {
            exit_code: 0,
            output: body
                .output
                .unwrap_or_else(|| "Command executed".to_string()),
        })
    }

    async fn upload_file(
        &self,
        handle: &SandboxHandle,
        bytes: Vec<u8>,
        path: &str,
    ) -> Result<(), SandboxError> {
        let file_name = path
            .rsplit('/')
            .next()
            .filter(|s| !s.is_empty())
            .unwrap_or("file")
            .to_string();
        let form = Form::new()
            .part("file", Part::bytes(bytes).file_name(file_name))
            .text("path", path.to_string());

        let resp = self
            .http
            .post(self.url(&format!("/sandboxes/{}/files", handle.id)))
            .header("Authorization", self.bearer())
            .multipart(form)
            .send()
            .await
            .map_err(SandboxError::from_transport)?;
        Self::check(resp).await?;
        Ok(())
    }

    async fn preview_link(
        &self,
        handle: &SandboxHandle,
        port: u16,
    ) -> Result<String, SandboxError> {
        let resp = self
            .http
            .get(self.url(&format!("/sandboxes/{}/preview", handle.id)))
            .query(&[("port", port)])
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(SandboxError::from_transport)?;
        let preview: PreviewResponse = Self::check(resp)
            .await?
            .json()
            .await
            .map_err(SandboxError::from_transport)?;
        Ok(match preview {
            PreviewResponse::Object { url } | PreviewResponse::Plain(url) => url,
        })
    }

    async fn delete(&self, handle: &SandboxHandle) -> Result<(), SandboxError> {
        let resp = self
            .http
            .delete(self.url(&format!("/sandboxes/{}", handle.id)))
            .header("Authorization", self.bearer())
            .send()
            .await
            .map_err(SandboxError::from_transport)?;
        Self::check(resp).await?;
        info!(id = %handle.id, "sandbox deleted");
        Ok(())
    }

    fn root_dir(&self, _handle: &SandboxHandle) -> String {
        WORKSPACE_ROOT.to_string()
    }
}

// ── Local simulation ─────────────────────────────────────────────────

/// Stub backend: fabricates ids, echoes commands, points at localhost.
#[derive(Debug, Clone)]
pub struct LocalSimulation {
    provisioning_delay: Duration,
}

impl Default for LocalSimulation {
    fn default() -> Self {
        Self {
            provisioning_delay: Duration::from_millis(500),
        }
    }
}

impl LocalSimulation {
    pub fn new(provisioning_delay: Duration) -> Self {
        Self { provisioning_delay }
    }
}

#[async_trait]
impl SandboxProvider for LocalSimulation {
    async fn create(&self, _image: &str, _public: bool) -> Result<SandboxHandle, SandboxError> {
        tokio::time::sleep(self.provisioning_delay).await;
        Ok(SandboxHandle {
            id: format!("local-sim-{}", Utc::now().timestamp_millis()),
        })
    }

    async fn exec(
        &self,
        _handle: &SandboxHandle,
        command: &str,
        cwd: Option<&str>,
    ) -> Result<ExecOutput, SandboxError> {
        debug!("[SIM] exec: {} in {}", command, cwd.unwrap_or("/"));
        Ok(ExecOutput {
            exit_code: 0,
            output: format!("Simulated: {}", command),
        })
    }

    async fn upload_file(
        &self,
        _handle: &SandboxHandle,
        bytes: Vec<u8>,
        path: &str,
    ) -> Result<(), SandboxError> {
        debug!("[SIM] upload: {} ({} bytes)", path, bytes.len());
        Ok(())
    }

    async fn preview_link(
        &self,
        _handle: &SandboxHandle,
        port: u16,
    ) -> Result<String, SandboxError> {
        Ok(format!("http://localhost:{}", port))
    }

    async fn delete(&self, _handle: &SandboxHandle) -> Result<(), SandboxError> {
        Ok(())
    }

    fn root_dir(&self, _handle: &SandboxHandle) -> String {
        WORKSPACE_ROOT.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn remote(server: &MockServer) -> RemoteSandboxClient {
        RemoteSandboxClient::new(&server.uri(), "sk-test", Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_create_sends_image_and_auth() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sandboxes"))
            .and(header("Authorization", "Bearer sk-test"))
            .and(body_json(json!({ "image": "node:20", "public": true })))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({ "id": "sb-1", "status": "starting" })))
            .expect(1)
            .mount(&server)
            .await;

        let handle = remote(&server).create("node:20", true).await.unwrap();
        assert_eq!(handle.id, "sb-1");
    }

    #[tokio::test]
    async fn test_exec_failure_status_is_exit_code_one() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sandboxes/sb-1/exec"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let handle = SandboxHandle { id: "sb-1".into() };
        let out = remote(&server).exec(&handle, "npm install", Some("/workspace/app")).await.unwrap();
        assert_eq!(out.exit_code, 1);
        assert!(out.output.starts_with("Command failed"));
    }

    #[tokio::test]
    async fn test_exec_success_output() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sandboxes/sb-1/exec"))
            .and(body_json(json!({ "command": "ls", "cwd": "/workspace" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "output": "app" })))
            .mount(&server)
            .await;

        let handle = SandboxHandle { id: "sb-1".into() };
        let out = remote(&server).exec(&handle, "ls", Some("/workspace")).await.unwrap();
        assert!(out.success());
        assert_eq!(out.output, "app");
    }

    #[tokio::test]
    async fn test_preview_link_and_delete() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sandboxes/sb-1/preview"))
            .and(query_param("port", "3000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "url": "https://3000-sb-1.example.dev" })))
            .mount(&server)
            .await;
        Mock::given(method("DELETE"))
            .and(path("/sandboxes/sb-1"))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let client = remote(&server);
        let handle = SandboxHandle { id: "sb-1".into() };
        assert_eq!(
            client.preview_link(&handle, 3000).await.unwrap(),
            "https://3000-sb-1.example.dev"
        );
        client.delete(&handle).await.unwrap();
    }

    #[tokio::test]
    async fn test_upload_is_multipart() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/sandboxes/sb-1/files"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "ok": true })))
            .expect(1)
            .mount(&server)
            .await;

        let handle = SandboxHandle { id: "sb-1".into() };
        remote(&server)
            .upload_file(&handle, b"<h1>x</h1>".to_vec(), "/workspace/app/index.html")
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let content_type = requests[0]
            .headers
            .get("content-type")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();
        assert!(content_type.starts_with("multipart/form-data"));
        let body = String::from_utf8_lossy(&requests[0].body);
        assert!(body.contains("name=\"path\""));
        assert!(body.contains("/workspace/app/index.html"));
        assert!(body.contains("filename=\"index.html\""));
    }

    #[tokio::test]
    async fn test_api_error_is_not_connectivity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403).set_body_string("forbidden"))
            .mount(&server)
            .await;

        let err = remote(&server).create("node:20", true).await.unwrap_err();
        assert!(matches!(err, SandboxError::Api { status: 403, .. }));
        assert!(!err.is_connectivity());
    }

    #[tokio::test]
    async fn test_unreachable_host_is_connectivity() {
        // Port 9 (discard) on localhost is closed on CI machines
        let client = RemoteSandboxClient::new("http://127.0.0.1:9", "k", Duration::from_secs(2)).unwrap();
        let err = client.create("node:20", true).await.unwrap_err();
        assert!(err.is_connectivity(), "got {err:?}");
    }

    #[tokio::test]
    async fn test_local_simulation() {
        let sim = LocalSimulation::new(Duration::ZERO);
        let handle = sim.create("node:20", true).await.unwrap();
        assert!(handle.id.starts_with("local-sim-"));

        let out = sim.exec(&handle, "npm install", None).await.unwrap();
        assert_eq!(out.output, "Simulated: npm install");
        assert_eq!(sim.preview_link(&handle, 3000).await.unwrap(), "http://localhost:3000");
        assert_eq!(sim.root_dir(&handle), "/workspace");
        sim.delete(&handle).await.unwrap();
    }

    #[test]
    fn test_missing_key_is_not_configured() {
        if env::var(SANDBOX_KEY_ENV).is_ok() {
            return;
        }
        let result = RemoteSandboxClient::from_settings(&SandboxSettings::default());
        assert!(matches!(result, Err(SandboxError::NotConfigured)));
    }
}
