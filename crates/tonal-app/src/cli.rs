//! CLI argument definitions for the Tonal application.
//!
//! Priority resolution: CLI args > env vars > config file > defaults.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Tonal - a voice and text assistant with a tunable personality.
#[derive(Parser, Debug)]
#[command(name = "tonal", version, about)]
pub struct CliArgs {
    /// Path to the configuration file.
    #[arg(short = 'c', long = "config", global = true)]
    pub config: Option<PathBuf>,

    /// Proxy server port (for `serve`).
    #[arg(short = 'p', long = "port", global = true)]
    pub port: Option<u16>,

    /// Data directory for saved chats and reply audio.
    #[arg(short = 'd', long = "data-dir", global = true)]
    pub data_dir: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short = 'l', long = "log-level", global = true)]
    pub log_level: Option<String>,

    /// Base URL of the proxy the shell talks to.
    #[arg(short = 's', long = "server", global = true)]
    pub server: Option<String>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Run the proxy server in front of the model provider.
    Serve,
    /// Start an interactive chat session (the default).
    Chat {
        /// Do not speak replies automatically.
        #[arg(long = "no-autoplay")]
        no_autoplay: bool,
    },
    /// List the personality presets.
    Presets,
    /// List saved chats.
    Chats,
}

impl CliArgs {
    /// The subcommand to run, defaulting to an interactive chat.
    pub fn command(&self) -> Command {
        self.command
            .clone()
            .unwrap_or(Command::Chat { no_autoplay: false })
    }

    /// Resolve the configuration file path.
    ///
    /// Priority: --config flag > TONAL_CONFIG env var > ~/.tonal/config.toml.
    pub fn resolve_config_path(&self) -> PathBuf {
        if let Some(ref p) = self.config {
            return p.clone();
        }
        if let Ok(p) = std::env::var("TONAL_CONFIG") {
            return PathBuf::from(p);
        }
        default_config_path()
    }

    /// Resolve the proxy server port.
    ///
    /// Priority: --port flag > TONAL_PORT env var > config file value.
    pub fn resolve_port(&self, config_port: u16) -> u16 {
        if let Some(p) = self.port {
            return p;
        }
        if let Ok(val) = std::env::var("TONAL_PORT") {
            if let Ok(p) = val.parse::<u16>() {
                return p;
            }
        }
        config_port
    }

    /// Data directory override, if given.
    pub fn resolve_data_dir(&self) -> Option<String> {
        self.data_dir
            .as_ref()
            .map(|p| p.to_string_lossy().to_string())
    }

    /// Log level override, if given.
    pub fn resolve_log_level(&self) -> Option<String> {
        self.log_level.clone()
    }

    /// Proxy URL override, if given.
    pub fn resolve_server(&self) -> Option<String> {
        self.server.clone()
    }
}

/// Default config file path.
fn default_config_path() -> PathBuf {
    let home = std::env::var("HOME").or_else(|_| std::env::var("USERPROFILE"));
    match home {
        Ok(home) => PathBuf::from(home).join(".tonal").join("config.toml"),
        Err(_) => PathBuf::from("config.toml"),
    }
}
