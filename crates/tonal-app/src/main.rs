//! Tonal application binary - composition root.
//!
//! 1. Parse CLI args and load configuration from TOML
//! 2. Initialize logging
//! 3. Either serve the proxy, or open chat storage and run the shell

mod audio;
mod cli;
mod render;
mod repl;
mod serve;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;

use tonal_chat::state::ConversationState;
use tonal_chat::{Collaborators, Locale, SessionManager, TurnOrchestrator, VoiceRecorder};
use tonal_client::ProxyClient;
use tonal_core::config::TonalConfig;
use tonal_storage::{ChatSessionStore, Database, SqliteKeyValueStore};

use audio::{FileAudioSource, FilePlayer};
use cli::{CliArgs, Command};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = CliArgs::parse();

    // Config, with CLI overrides applied.
    let config_file = args.resolve_config_path();
    let mut config = TonalConfig::load_or_default(&config_file);
    if let Some(dir) = args.resolve_data_dir() {
        config.general.data_dir = dir;
    }
    if let Some(level) = args.resolve_log_level() {
        config.general.log_level = level;
    }
    if let Some(url) = args.resolve_server() {
        config.client.base_url = url;
    }

    // Tracing goes to stderr so it never interleaves with shell output.
    let default_level = config.general.log_level.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    tracing::info!("Starting Tonal v{}", env!("CARGO_PKG_VERSION"));
    tracing::debug!(path = %config_file.display(), "Configuration resolved");

    match args.command() {
        Command::Serve => {
            let port = args.resolve_port(config.server.port);
            serve::run(&config, port).await
        }
        Command::Presets => {
            println!("{}", render::presets(None));
            Ok(())
        }
        Command::Chats => {
            let store = open_store(&config.data_dir())?;
            println!("{}", render::saved_chats(&store.list()));
            Ok(())
        }
        Command::Chat { no_autoplay } => chat(&config, !no_autoplay).await,
    }
}

/// Open the SQLite-backed saved-chat store in `data_dir`.
fn open_store(data_dir: &Path) -> Result<ChatSessionStore, Box<dyn std::error::Error>> {
    if let Err(e) = std::fs::create_dir_all(data_dir) {
        tracing::error!(path = %data_dir.display(), error = %e, "Failed to create data directory");
        return Err(e.into());
    }
    let db_path = data_dir.join("tonal.db");
    let db = Database::new(&db_path)?;
    tracing::info!(path = %db_path.display(), "SQLite database opened");
    Ok(ChatSessionStore::new(Arc::new(SqliteKeyValueStore::new(
        Arc::new(db),
    ))))
}

async fn chat(config: &TonalConfig, autoplay: bool) -> Result<(), Box<dyn std::error::Error>> {
    let locale = config.general.locale.parse::<Locale>().unwrap_or_else(|e| {
        tracing::warn!("{}; falling back to English", e);
        Locale::En
    });

    let data_dir = config.data_dir();
    let store = open_store(&data_dir)?;

    let client = Arc::new(ProxyClient::from_config(&config.client)?);
    match client.health().await {
        Ok(()) => tracing::info!(url = %client.base_url(), "Proxy reachable"),
        Err(e) => tracing::warn!(
            url = %client.base_url(),
            error = %e,
            "Proxy not reachable, start it with `tonal serve`"
        ),
    }

    let player = FilePlayer::new(
        data_dir.join(&config.playback.output_file),
        config.playback.command.clone(),
    );
    let collaborators = Collaborators {
        chat: client.clone(),
        transcription: client.clone(),
        speech: client,
        player: Arc::new(player),
    };

    let state = ConversationState::new().shared();
    let orchestrator =
        TurnOrchestrator::new(state.clone(), collaborators, config.client.timeout())
            .with_autoplay(autoplay && config.voice.autoplay);
    let sessions = SessionManager::new(state.clone(), store);
    let source = Arc::new(FileAudioSource::new());
    let recorder = VoiceRecorder::new(
        source.clone(),
        state,
        Duration::from_secs(u64::from(config.voice.max_recording_secs.max(1))),
    );

    let shell = repl::Shell::new(orchestrator, sessions, recorder, source, locale);
    shell.run().await?;
    tracing::info!("Goodbye");
    Ok(())
}
