//! Services - preview assembly, sandboxes, dev environment and storage

pub mod dev_env;
pub mod host;
pub mod preview;
pub mod project;
pub mod sandbox;
pub mod storage;

pub use dev_env::{DevEnvConfig, DevEnvironment, DevMode, DevSession, DevStatus};
pub use preview::{assemble_preview, render_artifact, SandboxOptions};
pub use sandbox::{LocalSimulation, RemoteSandboxClient, SandboxError, SandboxProvider};
pub use storage::{ChatHistoryRepository, FileStore, KeyValueStore, MemoryStore, SettingsRepository};
