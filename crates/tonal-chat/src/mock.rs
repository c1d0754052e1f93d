//! Mock collaborators.
//!
//! Scripted stand-ins for the chat, transcription and speech services and
//! the audio player, for tests here and in downstream crates.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;

use tonal_core::types::{AiResponse, AudioClip, ChatRequest};

use crate::collaborator::{
    AudioPlayer, ChatCollaborator, SpeechCollaborator, TranscriptionCollaborator,
};
use crate::error::CollaboratorError;

/// A reply whose short text and speech text are both `text`.
pub fn reply(text: &str, request: &ChatRequest) -> AiResponse {
    AiResponse {
        text_short: text.to_string(),
        text_long: text.to_string(),
        speech_text: text.to_string(),
        tone_summary: request.personality,
        action: Vec::new(),
    }
}

// =============================================================================
// Chat
// =============================================================================

/// Chat collaborator that answers every request the same way.
#[derive(Debug)]
pub struct MockChat {
    answer: Option<String>,
    speech: bool,
    delay: Duration,
    requests: Mutex<Vec<ChatRequest>>,
}

impl MockChat {
    /// Reply with `text` as short, long and speech text.
    pub fn replying(text: &str) -> Self {
        Self {
            answer: Some(text.to_string()),
            speech: true,
            delay: Duration::ZERO,
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Fail every request with a 500 status.
    pub fn failing() -> Self {
        Self {
            answer: None,
            ..Self::replying("")
        }
    }

    /// Leave `speech_text` empty in replies.
    pub fn without_speech(mut self) -> Self {
        self.speech = false;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// Every request received so far.
    pub fn requests(&self) -> Vec<ChatRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ChatCollaborator for MockChat {
    async fn complete(&self, request: &ChatRequest) -> Result<AiResponse, CollaboratorError> {
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.answer {
            Some(text) => {
                let mut response = reply(text, request);
                if !self.speech {
                    response.speech_text.clear();
                }
                Ok(response)
            }
            None => Err(CollaboratorError::Status {
                status: 500,
                details: "mock chat failure".to_string(),
            }),
        }
    }
}

// =============================================================================
// Transcription
// =============================================================================

/// Transcription collaborator returning a fixed transcript.
#[derive(Debug)]
pub struct MockTranscription {
    transcript: Option<String>,
    calls: AtomicUsize,
}

impl MockTranscription {
    pub fn returning(text: &str) -> Self {
        Self {
            transcript: Some(text.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            transcript: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranscriptionCollaborator for MockTranscription {
    async fn transcribe(&self, audio: &AudioClip) -> Result<String, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if audio.is_empty() {
            return Err(CollaboratorError::Status {
                status: 400,
                details: "empty audio".to_string(),
            });
        }
        self.transcript
            .clone()
            .ok_or_else(|| CollaboratorError::Transport("mock transcription failure".to_string()))
    }
}

// =============================================================================
// Speech and playback
// =============================================================================

/// Speech collaborator producing a small fake MP3 payload.
#[derive(Debug)]
pub struct MockSpeech {
    fail: bool,
    calls: AtomicUsize,
}

impl MockSpeech {
    pub fn new() -> Self {
        Self {
            fail: false,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockSpeech {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl SpeechCollaborator for MockSpeech {
    async fn synthesize(&self, text: &str) -> Result<AudioClip, CollaboratorError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(CollaboratorError::Unavailable(
                "mock speech failure".to_string(),
            ));
        }
        Ok(AudioClip::speech(text.as_bytes().to_vec()))
    }
}

/// Player that records what it was asked to play.
#[derive(Debug, Default)]
pub struct MockPlayer {
    fail: bool,
    duration: Duration,
    played: Mutex<Vec<AudioClip>>,
}

impl MockPlayer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    /// Take `duration` to play each clip, like a real output device.
    pub fn lasting(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    pub fn played(&self) -> Vec<AudioClip> {
        self.played.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl AudioPlayer for MockPlayer {
    async fn play(&self, clip: &AudioClip) -> Result<(), CollaboratorError> {
        if self.fail {
            return Err(CollaboratorError::Playback("no output device".to_string()));
        }
        if !self.duration.is_zero() {
            tokio::time::sleep(self.duration).await;
        }
        if let Ok(mut played) = self.played.lock() {
            played.push(clip.clone());
        }
        Ok(())
    }
}
