//! quire - chat with a local LLM about the PDFs you upload.
//!
//! ```text
//! quire report.pdf
//! > I uploaded my report
//! Document uploaded successfully
//! ```
//!
//! Files passed on the command line are uploaded to the session and attached
//! to the first turn. Turns are read from stdin; replies go to stdout and
//! logs to stderr.
//!
//! # Configuration
//!
//! - `QUIRE_CONFIG` - optional path to a `.toml`, `.json` or `.yaml` config file
//! - `QUIRE_MODEL` - model string, e.g. `ollama_chat/llama3.1:8b`
//! - `QUIRE_LLM_BASE_URL` / `OLLAMA_HOST` - model server address
//! - `RUST_LOG` - log filter

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::signal;
use tracing::{error, info, warn, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use quire_agent::{document_agent, Runner, Upload, UserInput};
use quire_core::{AgentConfig, InMemoryArtifactService, InMemorySessionService};
use quire_llm::LlmFactory;

const USER_ID: &str = "local_user";

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!(error = %e, "Failed to listen for Ctrl+C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                warn!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}

fn load_config() -> Result<AgentConfig> {
    let config = match std::env::var("QUIRE_CONFIG") {
        Ok(path) => {
            let mut config = AgentConfig::from_file(&path)
                .with_context(|| format!("failed to load config from {}", path))?;
            config.apply_env();
            config
        }
        Err(_) => AgentConfig::from_env(),
    };
    config.validate()?;
    Ok(config)
}

fn prompt() {
    print!("> ");
    // A failed flush only delays the prompt.
    let _ = std::io::stdout().flush();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables
    dotenvy::dotenv().ok();

    // Logs go to stderr; stdout is the conversation.
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env().add_directive(Level::INFO.into()))
        .init();

    let config = load_config()?;
    let llm = LlmFactory::from_config(config.llm.clone())?;
    let agent = Arc::new(document_agent(&config, llm)?);
    info!(agent = agent.name(), model = agent.llm().model_name(), "Agent ready");

    let sessions = Arc::new(InMemorySessionService::new());
    let artifacts = Arc::new(InMemoryArtifactService::new());
    let runner = Runner::new(
        config.app_name.clone(),
        agent,
        Arc::clone(&sessions),
        artifacts.clone(),
    )
    .with_max_tool_rounds(config.max_tool_rounds);

    let session = sessions
        .create_session(&config.app_name, USER_ID, None)
        .await?;
    info!(session = %session.key, "Session started");

    let mut pending_uploads = Vec::new();
    for path in std::env::args().skip(1) {
        let upload = Upload::from_path(&path)
            .await
            .with_context(|| format!("failed to read {}", path))?;
        info!(file = %upload.file_name, mime = %upload.mime_type, "Queued upload");
        pending_uploads.push(upload);
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let shutdown = shutdown_signal();
    tokio::pin!(shutdown);

    loop {
        prompt();
        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = &mut shutdown => break,
        };
        let Some(line) = line else {
            break;
        };
        if line.trim().is_empty() && pending_uploads.is_empty() {
            continue;
        }

        let input = UserInput::new(line).with_uploads(std::mem::take(&mut pending_uploads));
        tokio::select! {
            reply = runner.run(USER_ID, session.id(), input) => match reply {
                Ok(reply) => println!("{}", reply),
                Err(e) => {
                    error!(code = e.code().as_str(), error = %e, "Turn failed");
                    if let Some(suggestion) = e.suggestion() {
                        eprintln!("{}", suggestion);
                    }
                }
            },
            _ = &mut shutdown => break,
        }
    }

    artifacts.clear_session(&session.key).await;
    sessions.delete_session(&session.key).await?;
    info!("Goodbye");
    Ok(())
}
