//! Scripted recorder for integration tests
//!
//! Hands out queued clips (or failures) in order.

use std::collections::VecDeque;
use std::sync::Mutex;
use voicegate::audio::{AudioRecorder, RawAudio};
use voicegate::CaptureFailure;

pub struct ScriptedRecorder {
    script: Mutex<VecDeque<Result<RawAudio, CaptureFailure>>>,
    /// Durations requested by the caller, in order
    pub requested: Mutex<Vec<u32>>,
}

impl ScriptedRecorder {
    pub fn new(script: Vec<Result<RawAudio, CaptureFailure>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requested: Mutex::new(Vec::new()),
        }
    }

    pub fn clips(clips: Vec<RawAudio>) -> Self {
        Self::new(clips.into_iter().map(Ok).collect())
    }

    pub fn remaining(&self) -> usize {
        self.script.lock().unwrap().len()
    }
}

impl AudioRecorder for ScriptedRecorder {
    fn capture(&self, duration_secs: u32) -> Result<RawAudio, CaptureFailure> {
        self.requested.lock().unwrap().push(duration_secs);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(CaptureFailure::Exhausted))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}
