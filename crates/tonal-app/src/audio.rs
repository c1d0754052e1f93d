//! Local audio output and file-backed audio input.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use async_trait::async_trait;
use tracing::{debug, info};

use tonal_chat::collaborator::AudioPlayer;
use tonal_chat::error::{ChatError, CollaboratorError};
use tonal_chat::voice::AudioSource;
use tonal_core::types::AudioClip;

/// Writes each clip to a file and optionally hands it to a player command.
#[derive(Debug, Clone)]
pub struct FilePlayer {
    path: PathBuf,
    command: Option<String>,
}

impl FilePlayer {
    /// `command` is split on whitespace; the file path is appended last.
    pub fn new(path: PathBuf, command: Option<String>) -> Self {
        Self {
            path,
            command: command.filter(|c| !c.trim().is_empty()),
        }
    }
}

#[async_trait]
impl AudioPlayer for FilePlayer {
    async fn play(&self, clip: &AudioClip) -> Result<(), CollaboratorError> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| CollaboratorError::Playback(e.to_string()))?;
        }
        tokio::fs::write(&self.path, &clip.bytes)
            .await
            .map_err(|e| CollaboratorError::Playback(e.to_string()))?;
        debug!(path = %self.path.display(), bytes = clip.len(), "Reply audio written");

        let Some(command) = &self.command else {
            info!("Reply audio saved to {}", self.path.display());
            return Ok(());
        };
        let mut parts = command.split_whitespace();
        let Some(program) = parts.next() else {
            return Ok(());
        };
        let status = tokio::process::Command::new(program)
            .args(parts)
            .arg(&self.path)
            .status()
            .await
            .map_err(|e| CollaboratorError::Playback(format!("{}: {}", program, e)))?;
        if status.success() {
            Ok(())
        } else {
            Err(CollaboratorError::Playback(format!(
                "{} exited with {}",
                program, status
            )))
        }
    }
}

/// MIME type guessed from a file extension.
pub fn mime_for_path(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase)
        .as_deref()
    {
        Some("wav") => "audio/wav",
        Some("mp3") => "audio/mpeg",
        Some("ogg") | Some("oga") => "audio/ogg",
        Some("m4a") | Some("mp4") => "audio/mp4",
        _ => AudioClip::RECORDING_MIME,
    }
}

/// Audio source that "records" by reading a pre-recorded file.
///
/// The shell selects the file, then runs a recording session over it.
#[derive(Debug, Default)]
pub struct FileAudioSource {
    selected: Mutex<Option<PathBuf>>,
    captured: Mutex<Option<AudioClip>>,
}

impl FileAudioSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Choose the file the next recording reads.
    pub fn select(&self, path: PathBuf) {
        if let Ok(mut selected) = self.selected.lock() {
            *selected = Some(path);
        }
    }
}

#[async_trait]
impl AudioSource for FileAudioSource {
    async fn start(&self) -> Result<(), ChatError> {
        let path = self
            .selected
            .lock()
            .ok()
            .and_then(|s| s.clone())
            .ok_or_else(|| ChatError::Voice("no audio file selected".to_string()))?;
        let bytes = tokio::fs::read(&path)
            .await
            .map_err(|e| ChatError::Voice(format!("{}: {}", path.display(), e)))?;
        let clip = AudioClip::new(bytes, mime_for_path(&path));
        if let Ok(mut captured) = self.captured.lock() {
            *captured = Some(clip);
        }
        Ok(())
    }

    async fn finish(&self) -> Result<AudioClip, ChatError> {
        self.captured
            .lock()
            .ok()
            .and_then(|mut c| c.take())
            .ok_or_else(|| ChatError::Voice("nothing was captured".to_string()))
    }

    fn release(&self) {
        if let Ok(mut selected) = self.selected.lock() {
            selected.take();
        }
        if let Ok(mut captured) = self.captured.lock() {
            captured.take();
        }
    }
}
