//! [`Renderer`] – turns parsed segments into robot commands.
//!
//! Segments are dispatched strictly in source order:
//!
//! - `Text` → [`Robot::speak`] with the current voice (blocks until spoken);
//! - `Gesture` → [`Robot::gesture`] (returns immediately, so the next text
//!   starts while the robot is still moving);
//! - `Voice` → replaces the current voice for the rest of this response, no
//!   robot call.
//!
//! The voice starts from the renderer's defaults on every call.

use teddy_hal::{GestureLibrary, Robot};
use teddy_types::{Segment, TeddyError, VoiceParams};
use tracing::{debug, warn};

/// Counts of what one render pass dispatched.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RenderReport {
    pub spoken: usize,
    pub gestures: usize,
    pub voice_changes: usize,
}

#[derive(Debug, Clone, Default)]
pub struct Renderer {
    default_voice: VoiceParams,
}

impl Renderer {
    pub fn new(default_voice: VoiceParams) -> Self {
        Self { default_voice }
    }

    /// Dispatch `segments` to `robot`.
    ///
    /// # Errors
    ///
    /// Propagates the first [`TeddyError`] returned by the robot; segments
    /// after the failing one are not dispatched.
    pub fn render(
        &self,
        segments: &[Segment],
        library: &GestureLibrary,
        robot: &mut dyn Robot,
    ) -> Result<RenderReport, TeddyError> {
        let mut voice = self.default_voice;
        let mut report = RenderReport::default();

        for segment in segments {
            match segment {
                Segment::Text(text) => {
                    robot.speak(text, &voice)?;
                    report.spoken += 1;
                }
                Segment::Gesture(name) => match library.animation(name) {
                    Some(animation) => {
                        robot.gesture(name, animation)?;
                        report.gestures += 1;
                    }
                    None => warn!(gesture = %name, "gesture not in library, skipped"),
                },
                Segment::Voice(params) => {
                    if !params.within_advisory_bounds() {
                        debug!(?params, "voice parameters outside advisory bounds");
                    }
                    voice = *params;
                    report.voice_changes += 1;
                }
            }
        }
        Ok(report)
    }
}
