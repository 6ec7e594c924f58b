//! Capture and replay of control intents.
//!
//! One frame is stored per tick the recorded ship is alive and steerable,
//! so a replay consumes frames exactly when the capture produced them.

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::components::ControlIntents;
use crate::error::RecordingError;

/// Ordered intent frames, persisted as a whole.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    frames: Vec<ControlIntents>,
}

impl Recording {
    pub fn from_frames(frames: Vec<ControlIntents>) -> Self {
        Self { frames }
    }

    pub fn frames(&self) -> &[ControlIntents] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn to_bytes(&self) -> Result<Vec<u8>, RecordingError> {
        Ok(bincode::serde::encode_to_vec(
            self,
            bincode::config::standard(),
        )?)
    }

    pub fn from_bytes(bytes: &[u8]) -> Result<Self, RecordingError> {
        let (recording, _) =
            bincode::serde::decode_from_slice(bytes, bincode::config::standard())?;
        Ok(recording)
    }

    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), RecordingError> {
        let path = path.as_ref();
        std::fs::write(path, self.to_bytes()?)?;
        info!(frames = self.len(), path = %path.display(), "recording saved");
        Ok(())
    }

    pub fn load(path: impl AsRef<Path>) -> Result<Self, RecordingError> {
        let path = path.as_ref();
        let recording = Self::from_bytes(&std::fs::read(path)?)?;
        info!(frames = recording.len(), path = %path.display(), "recording loaded");
        Ok(recording)
    }
}

/// Accumulates frames during live play.
#[derive(Debug, Default)]
pub struct Recorder {
    recording: Recording,
}

impl Recorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, intents: ControlIntents) {
        self.recording.frames.push(intents);
    }

    pub fn len(&self) -> usize {
        self.recording.len()
    }

    pub fn is_empty(&self) -> bool {
        self.recording.is_empty()
    }

    pub fn finish(self) -> Recording {
        self.recording
    }
}

/// Replays a recording one frame per call.
#[derive(Debug)]
pub struct Playback {
    recording: Recording,
    cursor: usize,
}

impl Playback {
    pub fn new(recording: Recording) -> Self {
        Self {
            recording,
            cursor: 0,
        }
    }

    /// Next frame, or `EndOfStream` once every frame has been replayed.
    pub fn next_frame(&mut self) -> Result<ControlIntents, RecordingError> {
        match self.recording.frames.get(self.cursor) {
            Some(intents) => {
                self.cursor += 1;
                Ok(*intents)
            }
            None => {
                warn!(frames = self.cursor, "end of playback");
                Err(RecordingError::EndOfStream {
                    frames: self.cursor,
                })
            }
        }
    }

    pub fn position(&self) -> usize {
        self.cursor
    }

    pub fn remaining(&self) -> usize {
        self.recording.len() - self.cursor
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Recording {
        let mut recorder = Recorder::new();
        recorder.record(ControlIntents::thrust());
        recorder.record(ControlIntents::left());
        recorder.record(ControlIntents {
            shoot: true,
            shield: true,
            ..ControlIntents::IDLE
        });
        recorder.finish()
    }

    #[test]
    fn bytes_preserve_every_frame() {
        let recording = sample();
        let decoded = Recording::from_bytes(&recording.to_bytes().unwrap()).unwrap();
        assert_eq!(decoded, recording);
        assert_eq!(decoded.frames()[1], ControlIntents::left());
    }

    #[test]
    fn save_and_load_through_a_file() {
        let path = std::env::temp_dir().join(format!("mayhem-{}.rec", uuid::Uuid::new_v4()));
        let recording = sample();
        recording.save(&path).unwrap();
        let loaded = Recording::load(&path).unwrap();
        std::fs::remove_file(&path).unwrap();
        assert_eq!(loaded, recording);
    }

    #[test]
    fn truncated_bytes_fail_to_decode() {
        let bytes = sample().to_bytes().unwrap();
        assert!(matches!(
            Recording::from_bytes(&bytes[..bytes.len() - 1]),
            Err(RecordingError::Decode(_))
        ));
    }

    #[test]
    fn playback_reports_end_of_stream() {
        let mut playback = Playback::new(sample());
        assert_eq!(playback.next_frame().unwrap(), ControlIntents::thrust());
        assert_eq!(playback.remaining(), 2);
        playback.next_frame().unwrap();
        playback.next_frame().unwrap();

        match playback.next_frame() {
            Err(RecordingError::EndOfStream { frames }) => assert_eq!(frames, 3),
            other => panic!("expected end of stream, got {other:?}"),
        }
        assert_eq!(playback.position(), 3);
    }

    #[test]
    fn missing_file_is_io_error() {
        let path = std::env::temp_dir().join("mayhem-does-not-exist.rec");
        assert!(matches!(Recording::load(path), Err(RecordingError::Io(_))));
    }
}
