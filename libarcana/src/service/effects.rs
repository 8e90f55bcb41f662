//! Fire-and-forget sound cues
//!
//! Playback lives outside the library. Failures are logged by the caller and
//! never reach a flow's result.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SoundCue {
    /// Background ambience once the catalogs are loaded
    Ambient,
    /// A reading was revealed
    CardFlip,
}

pub trait SoundEffects: Send + Sync {
    fn play(&self, cue: SoundCue) -> Result<(), String>;
}

/// Discards every cue
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopEffects;

impl SoundEffects for NoopEffects {
    fn play(&self, _cue: SoundCue) -> Result<(), String> {
        Ok(())
    }
}

/// Records cues, optionally failing each one; for tests and embedders
#[derive(Debug, Clone, Default)]
pub struct RecordingEffects {
    played: std::sync::Arc<std::sync::Mutex<Vec<SoundCue>>>,
    fail: bool,
}

impl RecordingEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn played(&self) -> Vec<SoundCue> {
        self.played
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl SoundEffects for RecordingEffects {
    fn play(&self, cue: SoundCue) -> Result<(), String> {
        self.played
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(cue);
        if self.fail {
            return Err("audio device unavailable".to_string());
        }
        Ok(())
    }
}
