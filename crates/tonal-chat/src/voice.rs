//! Voice recording sessions.
//!
//! A recording acquires an audio source, captures until the caller stops it
//! or the maximum duration elapses, and always releases the source again.
//! Recording cannot start while a turn is processing.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, info};

use tonal_core::types::AudioClip;

use crate::error::ChatError;
use crate::state::{lock, SharedConversation};

/// Something that can capture speech: a microphone, a file, a test buffer.
#[async_trait]
pub trait AudioSource: Send + Sync {
    /// Acquire the device and begin capturing.
    async fn start(&self) -> Result<(), ChatError>;

    /// Stop capturing and return what was captured.
    async fn finish(&self) -> Result<AudioClip, ChatError>;

    /// Give the device back. Called exactly once per `start`, on every path.
    fn release(&self);
}

/// Runs recording sessions against one audio source.
pub struct VoiceRecorder {
    source: Arc<dyn AudioSource>,
    state: SharedConversation,
    max_duration: Duration,
    recording: AtomicBool,
}

/// Releases the source and clears the recording flag when dropped.
struct Recording<'a> {
    recorder: &'a VoiceRecorder,
    started: bool,
}

impl Drop for Recording<'_> {
    fn drop(&mut self) {
        if self.started {
            self.recorder.source.release();
            debug!("Audio source released");
        }
        self.recorder.recording.store(false, Ordering::SeqCst);
    }
}

impl VoiceRecorder {
    pub fn new(
        source: Arc<dyn AudioSource>,
        state: SharedConversation,
        max_duration: Duration,
    ) -> Self {
        Self {
            source,
            state,
            max_duration,
            recording: AtomicBool::new(false),
        }
    }

    pub fn is_recording(&self) -> bool {
        self.recording.load(Ordering::SeqCst)
    }

    /// Record until `stop` resolves or the maximum duration is reached.
    pub async fn record<F>(&self, stop: F) -> Result<AudioClip, ChatError>
    where
        F: Future<Output = ()> + Send,
    {
        if !lock(&self.state).is_idle() {
            return Err(ChatError::Busy);
        }
        if self.recording.swap(true, Ordering::SeqCst) {
            return Err(ChatError::Voice("already recording".to_string()));
        }
        let mut session = Recording {
            recorder: self,
            started: false,
        };

        self.source.start().await?;
        session.started = true;
        debug!(max_secs = self.max_duration.as_secs(), "Recording started");

        tokio::select! {
            _ = stop => debug!("Recording stopped"),
            _ = tokio::time::sleep(self.max_duration) => {
                info!("Recording reached its {:?} limit", self.max_duration);
            }
        }

        let clip = self.source.finish().await?;
        if clip.is_empty() {
            return Err(ChatError::Voice("no audio captured".to_string()));
        }
        debug!(bytes = clip.len(), "Recording finished");
        Ok(clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    use crate::state::ConversationState;

    #[derive(Default)]
    struct BufferSource {
        bytes: Vec<u8>,
        fail_start: bool,
        starts: AtomicUsize,
        releases: AtomicUsize,
    }

    #[async_trait]
    impl AudioSource for BufferSource {
        async fn start(&self) -> Result<(), ChatError> {
            if self.fail_start {
                return Err(ChatError::Voice("microphone denied".to_string()));
            }
            self.starts.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }

        async fn finish(&self) -> Result<AudioClip, ChatError> {
            Ok(AudioClip::recording(self.bytes.clone()))
        }

        fn release(&self) {
            self.releases.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn recorder(source: Arc<BufferSource>, max: Duration) -> VoiceRecorder {
        VoiceRecorder::new(source, ConversationState::new().shared(), max)
    }

    #[tokio::test]
    async fn test_record_until_stopped() {
        let source = Arc::new(BufferSource {
            bytes: vec![1, 2, 3],
            ..Default::default()
        });
        let recorder = recorder(source.clone(), Duration::from_secs(60));

        let clip = recorder.record(std::future::ready(())).await.unwrap();
        assert_eq!(clip.bytes, vec![1, 2, 3]);
        assert_eq!(clip.mime_type, AudioClip::RECORDING_MIME);
        assert_eq!(source.releases.load(Ordering::SeqCst), 1);
        assert!(!recorder.is_recording());
    }

    #[tokio::test]
    async fn test_max_duration_stops_recording() {
        let source = Arc::new(BufferSource {
            bytes: vec![9],
            ..Default::default()
        });
        let recorder = recorder(source.clone(), Duration::from_millis(10));

        let clip = recorder.record(std::future::pending()).await.unwrap();
        assert_eq!(clip.bytes, vec![9]);
        assert_eq!(source.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_refused_while_processing() {
        let source = Arc::new(BufferSource::default());
        let state = ConversationState::new().shared();
        lock(&state).begin_turn().unwrap();
        let recorder = VoiceRecorder::new(source.clone(), state, Duration::from_secs(1));

        let err = recorder.record(std::future::ready(())).await.unwrap_err();
        assert!(matches!(err, ChatError::Busy));
        assert_eq!(source.starts.load(Ordering::SeqCst), 0);
        assert_eq!(source.releases.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_refused_while_already_recording() {
        let source = Arc::new(BufferSource {
            bytes: vec![1],
            ..Default::default()
        });
        let recorder = recorder(source.clone(), Duration::from_millis(50));

        let (first, second) = tokio::join!(recorder.record(std::future::pending()), async {
            tokio::task::yield_now().await;
            recorder.record(std::future::ready(())).await
        });

        assert!(first.is_ok());
        assert!(matches!(second, Err(ChatError::Voice(_))));
        assert_eq!(source.starts.load(Ordering::SeqCst), 1);
        assert_eq!(source.releases.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_empty_capture_still_releases() {
        let source = Arc::new(BufferSource::default());
        let recorder = recorder(source.clone(), Duration::from_secs(1));

        let err = recorder.record(std::future::ready(())).await.unwrap_err();
        assert!(matches!(err, ChatError::Voice(_)));
        assert_eq!(source.releases.load(Ordering::SeqCst), 1);
        assert!(!recorder.is_recording());
    }

    #[tokio::test]
    async fn test_failed_start_clears_flag() {
        let source = Arc::new(BufferSource {
            fail_start: true,
            ..Default::default()
        });
        let recorder = recorder(source.clone(), Duration::from_secs(1));

        assert!(recorder.record(std::future::ready(())).await.is_err());
        assert!(!recorder.is_recording());
        assert_eq!(source.releases.load(Ordering::SeqCst), 0);
    }
}
