//! Artifact Studio - headless front end.
//!
//! Sends one prompt, writes the generated files plus an assembled
//! `preview.html`, and optionally runs them in a dev environment until
//! Ctrl-C.

use agent_host::ChatAgent;
use anyhow::{bail, Context, Result};
use clap::Parser;
use services::dev_env::{DevEnvConfig, DevEnvironment, DevMode, DevStatus};
use services::sandbox::{LocalSimulation, RemoteSandboxClient, SandboxProvider};
use services::storage::{ChatHistoryRepository, FileStore, KeyValueStore, SettingsRepository};
use services::{assemble_preview, render_artifact};
use shared::agent_api::ChatMessage;
use shared::artifact::Artifact;
use std::fs;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

const TITLE_MAX_CHARS: usize = 50;

#[derive(Parser)]
#[command(name = "artifact-studio")]
#[command(author, version, about = "Generate web artifacts from a prompt and preview them", long_about = None)]
struct Cli {
    /// What to build
    prompt: String,

    /// Directory for generated files and preview.html
    #[arg(short, long, default_value = "artifact-preview")]
    out: PathBuf,

    /// Run the result in a dev environment until Ctrl-C
    #[arg(long)]
    run: bool,

    /// Use the remote sandbox service (falls back to local simulation)
    #[arg(long, requires = "run")]
    remote: bool,

    /// Override the settings directory
    #[arg(long, env = "ARTIFACT_STUDIO_CONFIG_DIR")]
    config_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();

    let store: Arc<dyn KeyValueStore> = match &cli.config_dir {
        Some(dir) => Arc::new(FileStore::new(dir)),
        None => Arc::new(FileStore::in_config_dir()?),
    };
    let settings = SettingsRepository::new(store.clone()).load();

    let agent = ChatAgent::from_settings(&settings)
        .context("completion API is not configured (set ARTIFACT_STUDIO_API_KEY)")?;

    let Some(reply) = agent.send_message(&cli.prompt).await else {
        bail!("prompt is empty");
    };
    println!("{}", reply.content);

    let written = write_outputs(&cli.out, &reply.code_artifacts)?;
    info!(files = written.len(), dir = %cli.out.display(), "artifacts written");
    println!("Preview: {}", cli.out.join("preview.html").display());

    record_history(&ChatHistoryRepository::new(store), &cli.prompt, &reply);

    if cli.run {
        run_dev_environment(&settings, cli.remote, &reply.code_artifacts).await?;
    }
    Ok(())
}

/// Write every artifact under `out/files/`, one sandbox page per artifact
/// under `out/frames/`, and the assembled `out/preview.html`.
fn write_outputs(out: &Path, artifacts: &[Artifact]) -> Result<Vec<PathBuf>> {
    let files_dir = out.join("files");
    let frames_dir = out.join("frames");
    fs::create_dir_all(&files_dir)
        .with_context(|| format!("cannot create {}", files_dir.display()))?;
    fs::create_dir_all(&frames_dir)?;

    let mut written = Vec::new();
    for (index, artifact) in artifacts.iter().enumerate() {
        let Some(relative) = safe_relative_path(artifact.filename()) else {
            warn!("Skipping artifact with unsafe path: {}", artifact.filename());
            continue;
        };
        let target = files_dir.join(relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&target, artifact.content())
            .with_context(|| format!("cannot write {}", target.display()))?;
        written.push(target);

        let frame = frames_dir.join(format!("{:02}-{}.html", index, artifact.kind()));
        fs::write(&frame, render_artifact(artifact))?;
    }

    fs::write(out.join("preview.html"), assemble_preview(artifacts))?;
    Ok(written)
}

/// Relative path with no root, prefix or `..` components
fn safe_relative_path(filename: &str) -> Option<PathBuf> {
    let path = Path::new(filename);
    let mut clean = PathBuf::new();
    for component in path.components() {
        match component {
            Component::Normal(part) => clean.push(part),
            Component::CurDir => {}
            _ => return None,
        }
    }
    (!clean.as_os_str().is_empty()).then_some(clean)
}

fn record_history(repo: &ChatHistoryRepository, prompt: &str, reply: &ChatMessage) {
    let mut history = repo.load();
    let title: String = prompt.trim().chars().take(TITLE_MAX_CHARS).collect();
    history.add(&title, 2, Some(&reply.content));
    if let Err(e) = repo.save(&history) {
        warn!("Could not save chat history: {}", e);
    }
}

async fn run_dev_environment(
    settings: &shared::settings::AppSettings,
    remote: bool,
    artifacts: &[Artifact],
) -> Result<()> {
    let remote_client: Option<Arc<dyn SandboxProvider>> = if remote {
        match RemoteSandboxClient::from_settings(&settings.sandbox) {
            Ok(client) => Some(Arc::new(client)),
            Err(e) => {
                warn!("Remote sandbox unavailable: {}", e);
                None
            }
        }
    } else {
        None
    };

    // Stop-phase lines are printed after Ctrl-C
    let config = DevEnvConfig {
        clear_logs_on_stop: false,
        ..DevEnvConfig::from_settings(&settings.sandbox)
    };
    let mut env = DevEnvironment::new(config, Arc::new(LocalSimulation::default()), remote_client);
    if remote {
        env.set_mode(DevMode::RemoteCloud);
    }

    env.start(artifacts).await;
    let printed = print_logs_since(&env, 0);

    match env.session().status() {
        DevStatus::Running => {
            if let Some(url) = env.session().url() {
                println!("Dev environment running at {} (Ctrl-C to stop)", url);
            }
            tokio::signal::ctrl_c()
                .await
                .context("cannot listen for Ctrl-C")?;
            env.stop().await;
            print_logs_since(&env, printed);
            Ok(())
        }
        _ => bail!(
            "dev environment failed: {}",
            env.session().error().unwrap_or("unknown error")
        ),
    }
}

/// Print session log lines from index `from` on and return the new total
fn print_logs_since(env: &DevEnvironment, from: usize) -> usize {
    let lines = new_log_lines(env, from);
    for line in lines {
        println!("{}", line);
    }
    from + lines.len()
}

fn new_log_lines(env: &DevEnvironment, from: usize) -> &[String] {
    let logs = env.session().logs();
    logs.get(from..).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use services::storage::MemoryStore;
    use tempfile::TempDir;

    #[test]
    fn test_safe_relative_path() {
        assert_eq!(safe_relative_path("src/App.jsx"), Some(PathBuf::from("src/App.jsx")));
        assert_eq!(safe_relative_path("./index.html"), Some(PathBuf::from("index.html")));
        assert_eq!(safe_relative_path("../etc/passwd"), None);
        assert_eq!(safe_relative_path("/etc/passwd"), None);
        assert_eq!(safe_relative_path("."), None);
    }

    #[test]
    fn test_write_outputs() {
        let tmp = TempDir::new().unwrap();
        let artifacts = vec![
            Artifact::from_language("index.html", "html", r#"<script src="js/app.js"></script>"#),
            Artifact::from_language("js/app.js", "js", "go()"),
            Artifact::from_language("../evil.js", "js", "nope"),
        ];

        let written = write_outputs(tmp.path(), &artifacts).unwrap();
        assert_eq!(written.len(), 2);
        assert!(tmp.path().join("files/js/app.js").exists());
        assert!(!tmp.path().join("evil.js").exists());
        assert!(tmp.path().join("frames/00-html.html").exists());

        let preview = fs::read_to_string(tmp.path().join("preview.html")).unwrap();
        assert_eq!(preview, "<script>go()</script>");
    }

    #[tokio::test]
    async fn test_stop_phase_logs_follow_start_logs() {
        let config = DevEnvConfig {
            server_wait: std::time::Duration::ZERO,
            clear_logs_on_stop: false,
            ..DevEnvConfig::default()
        };
        let mut env = DevEnvironment::new(
            config,
            Arc::new(LocalSimulation::new(std::time::Duration::ZERO)),
            None,
        );
        env.start(&[Artifact::from_language("index.html", "html", "<p>hi</p>")]).await;
        let printed = print_logs_since(&env, 0);
        assert_eq!(printed, env.session().logs().len());

        env.stop().await;
        let stop_lines = new_log_lines(&env, printed);
        assert!(stop_lines.iter().any(|l| l.contains("Stopping environment")));
        assert!(stop_lines.iter().any(|l| l.contains("Environment stopped")));
        assert!(new_log_lines(&env, 10_000).is_empty());
    }

    #[test]
    fn test_record_history_prepends_session() {
        let repo = ChatHistoryRepository::new(Arc::new(MemoryStore::new()));
        record_history(&repo, "  build a snake game  ", &ChatMessage::assistant("done"));

        let history = repo.load();
        assert_eq!(history.len(), 1);
        assert_eq!(history.sessions()[0].title, "build a snake game");
        assert_eq!(history.sessions()[0].last_message.as_deref(), Some("done"));
    }
}
