use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Advisory pitch band (NAO `vct` units) that prompts ask the model to respect.
pub const PITCH_RANGE: (f32, f32) = (70.0, 100.0);
/// Advisory pitch-shift band.
pub const PITCH_SHIFT_RANGE: (f32, f32) = (2.0, 3.0);
/// Advisory speaking-rate band (percent of nominal speed).
pub const SPEED_RANGE: (f32, f32) = (75.0, 300.0);

/// Speech-rendering parameters carried by every spoken segment.
///
/// The advisory bands above are part of the prompt contract only; nothing in
/// the parser or renderer clamps or rejects values outside them.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VoiceParams {
    pub pitch: f32,
    pub pitch_shift: f32,
    pub speed: f32,
}

impl VoiceParams {
    pub const fn new(pitch: f32, pitch_shift: f32, speed: f32) -> Self {
        Self {
            pitch,
            pitch_shift,
            speed,
        }
    }

    /// `true` when every field lies inside its advisory band.
    pub fn within_advisory_bounds(&self) -> bool {
        let inside = |v: f32, (lo, hi): (f32, f32)| v >= lo && v <= hi;
        inside(self.pitch, PITCH_RANGE)
            && inside(self.pitch_shift, PITCH_SHIFT_RANGE)
            && inside(self.speed, SPEED_RANGE)
    }
}

impl Default for VoiceParams {
    /// The robot's unmodified voice: full pitch, no shift, nominal speed.
    fn default() -> Self {
        Self::new(100.0, 1.0, 100.0)
    }
}

/// One span of a parsed model response.
///
/// A response is an ordered list of segments, built fresh per turn and
/// consumed by the renderer in source order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "payload")]
pub enum Segment {
    /// Spoken content.
    Text(String),
    /// A gesture referencing a gesture-library key.
    Gesture(String),
    /// A voice-parameter change applied to all following text in the response.
    Voice(VoiceParams),
}

impl Segment {
    pub fn text(content: impl Into<String>) -> Self {
        Segment::Text(content.into())
    }

    pub fn gesture(name: impl Into<String>) -> Self {
        Segment::Gesture(name.into())
    }
}

/// Workspace-wide error type for failures that escape a single turn.
#[derive(Error, Debug)]
pub enum TeddyError {
    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Sensor Fault: {0}")]
    SensorFault(String),

    #[error("Chat Log Error: {0}")]
    ChatLog(String),

    #[error("Oracle Error: {0}")]
    Oracle(String),

    #[error("Configuration Error: {0}")]
    Configuration(String),
}

impl TeddyError {
    pub fn hardware(component: impl Into<String>, details: impl Into<String>) -> Self {
        TeddyError::HardwareFault {
            component: component.into(),
            details: details.into(),
        }
    }
}
