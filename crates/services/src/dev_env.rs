//! Dev-environment controller.
//!
//! State lives in [`DevSession`] and only changes through [`reduce`], which
//! returns the side effects to run next. [`DevEnvironment`] executes those
//! effects against a sandbox backend and feeds the outcomes back in as events.
//!
//! ```text
//! stopped --start--> starting --ready--> running --stop--> stopped
//!    ^                  |
//!    |                  +--failed--> error --start--> starting
//!    +----set_mode---------------------+
//! ```

use crate::sandbox::{SandboxError, SandboxHandle, SandboxProvider};
use chrono::Local;
use serde::{Deserialize, Serialize};
use shared::artifact::Artifact;
use shared::settings::SandboxSettings;
use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevStatus {
    Stopped,
    Starting,
    Running,
    Error,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DevMode {
    #[default]
    LocalSimulation,
    RemoteCloud,
}

impl DevMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DevMode::LocalSimulation => "local_simulation",
            DevMode::RemoteCloud => "remote_cloud",
        }
    }
}

/// Ephemeral state of one dev environment
#[derive(Debug, Clone)]
pub struct DevSession {
    status: DevStatus,
    mode: DevMode,
    logs: Vec<String>,
    port: Option<u16>,
    url: Option<String>,
    error: Option<String>,
    sandbox: Option<SandboxHandle>,
}

impl Default for DevSession {
    fn default() -> Self {
        Self::new(DevMode::default())
    }
}

impl DevSession {
    pub fn new(mode: DevMode) -> Self {
        Self {
            status: DevStatus::Stopped,
            mode,
            logs: Vec::new(),
            port: None,
            url: None,
            error: None,
            sandbox: None,
        }
    }

    pub fn status(&self) -> DevStatus {
        self.status
    }

    pub fn mode(&self) -> DevMode {
        self.mode
    }

    pub fn logs(&self) -> &[String] {
        &self.logs
    }

    pub fn port(&self) -> Option<u16> {
        self.port
    }

    pub fn url(&self) -> Option<&str> {
        self.url.as_deref()
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn sandbox(&self) -> Option<&SandboxHandle> {
        self.sandbox.as_ref()
    }

    fn log(&mut self, message: impl AsRef<str>) {
        let message = message.as_ref();
        info!(target: "dev_env", "{}", message);
        self.logs
            .push(format!("[{}] {}", Local::now().format("%H:%M:%S"), message));
    }
}

/// Inputs to the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum DevEvent {
    StartRequested,
    Provisioned(SandboxHandle),
    ProvisioningFailed(String),
    Progress(String),
    Ready { port: u16, url: String },
    Failed(String),
    StopRequested,
    StopCompleted { clear_logs: bool },
    ModeChangeRequested(DevMode),
}

/// Work the driver must perform after a transition
#[derive(Debug, Clone, PartialEq)]
pub enum DevEffect {
    /// Create a sandbox with the backend for this mode
    Provision(DevMode),
    /// Upload the artifacts, launch the server, fetch the preview link
    Deploy(SandboxHandle),
    /// Best-effort removal of a remote sandbox
    DeleteSandbox(SandboxHandle),
    /// Reset the session once teardown is done
    FinishStop,
}

/// Apply one event. Rejected events only append a log line.
pub fn reduce(session: &mut DevSession, event: DevEvent) -> Vec<DevEffect> {
    match event {
        DevEvent::StartRequested => match session.status {
            DevStatus::Stopped | DevStatus::Error => {
                session.status = DevStatus::Starting;
                session.error = None;
                session.port = None;
                session.url = None;
                session.log(format!("Starting environment in mode {}", session.mode.as_str()));
                vec![DevEffect::Provision(session.mode)]
            }
            status => {
                session.log(format!("Start ignored: environment is {:?}", status));
                vec![]
            }
        },

        DevEvent::ProvisioningFailed(error) if session.status == DevStatus::Starting => {
            session.log(format!("Provisioning failed: {}", error));
            if session.mode == DevMode::RemoteCloud {
                session.log("Falling back to local simulation");
                session.mode = DevMode::LocalSimulation;
                vec![DevEffect::Provision(DevMode::LocalSimulation)]
            } else {
                fail(session, error)
            }
        }

        DevEvent::Provisioned(handle) if session.status == DevStatus::Starting => {
            session.log(format!("Sandbox '{}' ready", handle.id));
            session.sandbox = Some(handle.clone());
            vec![DevEffect::Deploy(handle)]
        }

        DevEvent::Progress(message) => {
            session.log(message);
            vec![]
        }

        DevEvent::Ready { port, url } if session.status == DevStatus::Starting => {
            session.log(format!("Preview available at {}", url));
            session.status = DevStatus::Running;
            session.port = Some(port);
            session.url = Some(url);
            vec![]
        }

        DevEvent::Failed(error) if session.status == DevStatus::Starting => fail(session, error),

        DevEvent::StopRequested => {
            if session.status != DevStatus::Running {
                session.log(format!("Stop ignored: environment is {:?}", session.status));
                return vec![];
            }
            session.log("Stopping environment");
            let mut effects = Vec::new();
            if session.mode == DevMode::RemoteCloud {
                if let Some(handle) = session.sandbox.clone() {
                    effects.push(DevEffect::DeleteSandbox(handle));
                }
            }
            effects.push(DevEffect::FinishStop);
            effects
        }

        DevEvent::StopCompleted { clear_logs } => {
            session.status = DevStatus::Stopped;
            session.port = None;
            session.url = None;
            session.error = None;
            session.sandbox = None;
            if clear_logs {
                session.logs.clear();
            } else {
                session.log("Environment stopped");
            }
            vec![]
        }

        DevEvent::ModeChangeRequested(mode) => match session.status {
            DevStatus::Stopped | DevStatus::Error => {
                session.mode = mode;
                session.status = DevStatus::Stopped;
                session.error = None;
                session.logs.clear();
                session.log(format!("Mode switched to {}", mode.as_str()));
                vec![]
            }
            _ => {
                session.log("Stop the running environment before switching modes");
                vec![]
            }
        },

        other => {
            warn!(?other, status = ?session.status, "event ignored in current state");
            vec![]
        }
    }
}

fn fail(session: &mut DevSession, error: String) -> Vec<DevEffect> {
    session.log(format!("Failed to start environment: {}", error));
    session.status = DevStatus::Error;
    session.error = Some(error);
    session.port = None;
    session.url = None;

    match session.sandbox.take() {
        Some(handle) if session.mode == DevMode::RemoteCloud => {
            session.log(format!("Cleaning up sandbox {}", handle.id));
            vec![DevEffect::DeleteSandbox(handle)]
        }
        _ => vec![],
    }
}

// ── Driver ───────────────────────────────────────────────────────────

/// Timing and sandbox parameters for the driver
#[derive(Debug, Clone)]
pub struct DevEnvConfig {
    pub image: String,
    pub public: bool,
    pub port: u16,
    /// Pause between launching the server and asking for the preview link
    pub server_wait: Duration,
    /// Pause between stop and start on restart
    pub restart_settle: Duration,
    pub clear_logs_on_stop: bool,
}

impl Default for DevEnvConfig {
    fn default() -> Self {
        Self::from_settings(&SandboxSettings::default())
    }
}

impl DevEnvConfig {
    pub fn from_settings(settings: &SandboxSettings) -> Self {
        Self {
            image: settings.image.clone(),
            public: settings.public,
            port: 3000,
            server_wait: Duration::from_secs(10),
            restart_settle: Duration::from_millis(500),
            clear_logs_on_stop: true,
        }
    }
}

/// Executes [`DevEffect`]s against the local and remote backends.
pub struct DevEnvironment {
    session: DevSession,
    config: DevEnvConfig,
    local: Arc<dyn SandboxProvider>,
    remote: Option<Arc<dyn SandboxProvider>>,
}

impl DevEnvironment {
    pub fn new(
        config: DevEnvConfig,
        local: Arc<dyn SandboxProvider>,
        remote: Option<Arc<dyn SandboxProvider>>,
    ) -> Self {
        Self {
            session: DevSession::default(),
            config,
            local,
            remote,
        }
    }

    pub fn session(&self) -> &DevSession {
        &self.session
    }

    pub async fn start(&mut self, artifacts: &[Artifact]) {
        self.run(DevEvent::StartRequested, artifacts).await;
    }

    pub async fn stop(&mut self) {
        self.run(DevEvent::StopRequested, &[]).await;
    }

    pub async fn restart(&mut self, artifacts: &[Artifact]) {
        self.stop().await;
        tokio::time::sleep(self.config.restart_settle).await;
        self.start(artifacts).await;
    }

    pub fn set_mode(&mut self, mode: DevMode) {
        let effects = reduce(&mut self.session, DevEvent::ModeChangeRequested(mode));
        debug_assert!(effects.is_empty());
    }

    async fn run(&mut self, event: DevEvent, artifacts: &[Artifact]) {
        let mut queue: VecDeque<DevEffect> = reduce(&mut self.session, event).into();
        while let Some(effect) = queue.pop_front() {
            if let Some(next) = self.execute(effect, artifacts).await {
                queue.extend(reduce(&mut self.session, next));
            }
        }
    }

    fn provider(&self, mode: DevMode) -> Option<Arc<dyn SandboxProvider>> {
        match mode {
            DevMode::LocalSimulation => Some(self.local.clone()),
            DevMode::RemoteCloud => self.remote.clone(),
        }
    }

    async fn execute(&mut self, effect: DevEffect, artifacts: &[Artifact]) -> Option<DevEvent> {
        match effect {
            DevEffect::Provision(mode) => {
                let Some(provider) = self.provider(mode) else {
                    return Some(DevEvent::ProvisioningFailed(
                        SandboxError::NotConfigured.to_string(),
                    ));
                };
                self.progress(match mode {
                    DevMode::LocalSimulation => "Starting local simulation".to_string(),
                    DevMode::RemoteCloud => "Creating remote sandbox".to_string(),
                });
                Some(
                    match provider.create(&self.config.image, self.config.public).await {
                        Ok(handle) => DevEvent::Provisioned(handle),
                        Err(e) => {
                            if e.is_connectivity() {
                                warn!("Sandbox host unreachable: {}", e);
                            } else {
                                warn!("Sandbox provisioning rejected: {}", e);
                            }
                            DevEvent::ProvisioningFailed(e.to_string())
                        }
                    },
                )
            }
            DevEffect::Deploy(handle) => {
                let Some(provider) = self.provider(self.session.mode) else {
                    return Some(DevEvent::Failed(SandboxError::NotConfigured.to_string()));
                };
                Some(match self.deploy(provider.as_ref(), &handle, artifacts).await {
                    Ok(url) => DevEvent::Ready {
                        port: self.config.port,
                        url,
                    },
                    Err(e) => DevEvent::Failed(e.to_string()),
                })
            }
            DevEffect::DeleteSandbox(handle) => {
                let Some(remote) = self.remote.clone() else {
                    return None;
                };
                Some(DevEvent::Progress(match remote.delete(&handle).await {
                    Ok(()) => format!("Sandbox {} removed", handle.id),
                    Err(e) => {
                        warn!("sandbox cleanup failed: {}", e);
                        format!("Warning: sandbox {} could not be removed: {}", handle.id, e)
                    }
                }))
            }
            DevEffect::FinishStop => Some(DevEvent::StopCompleted {
                clear_logs: self.config.clear_logs_on_stop,
            }),
        }
    }

    fn progress(&mut self, message: impl Into<String>) {
        reduce(&mut self.session, DevEvent::Progress(message.into()));
    }

    async fn deploy(
        &mut self,
        provider: &dyn SandboxProvider,
        handle: &SandboxHandle,
        artifacts: &[Artifact],
    ) -> Result<String, SandboxError> {
        let project_dir = format!("{}/app", provider.root_dir(handle));
        self.progress(format!("Project directory: {}", project_dir));
        provider
            .exec(handle, &format!("mkdir -p {}", shell_quote(&project_dir)), None)
            .await?;

        self.progress(format!("Uploading {} generated files", artifacts.len()));
        for artifact in artifacts {
            let path = format!("{}/{}", project_dir, artifact.filename());
            if let Some((dir, _)) = path.rsplit_once('/') {
                if dir != project_dir {
                    provider
                        .exec(handle, &format!("mkdir -p {}", shell_quote(dir)), None)
                        .await?;
                }
            }
            provider
                .upload_file(handle, artifact.content().as_bytes().to_vec(), &path)
                .await?;
        }
        self.progress("Files uploaded");

        let port = self.config.port;
        if artifacts.iter().any(|a| a.filename() == "package.json") {
            self.progress("Node.js project detected, installing dependencies");
            let install = provider.exec(handle, "npm install", Some(&project_dir)).await?;
            if !install.success() {
                self.progress(format!(
                    "npm install exited with code {}: {}",
                    install.exit_code, install.output
                ));
            }
            self.progress("Starting dev server");
            provider
                .exec(
                    handle,
                    &format!("PORT={} nohup npm run dev > dev-server.log 2>&1 &", port),
                    Some(&project_dir),
                )
                .await?;
        } else {
            self.progress("Static site detected, starting python HTTP server");
            provider
                .exec(
                    handle,
                    &format!("nohup python3 -m http.server {} > dev-server.log 2>&1 &", port),
                    Some(&project_dir),
                )
                .await?;
        }

        self.progress(format!(
            "Waiting for server start ({}s)",
            self.config.server_wait.as_secs()
        ));
        tokio::time::sleep(self.config.server_wait).await;

        self.progress("Fetching preview link");
        provider.preview_link(handle, port).await
    }
}

/// Single-quote a word for `sh`; embedded quotes become `'\''`
fn shell_quote(word: &str) -> String {
    format!("'{}'", word.replace('\'', r"'\''"))
}
