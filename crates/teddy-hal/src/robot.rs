//! Generic `Robot` trait for a humanoid that can talk and gesture.
//!
//! Drivers implement this trait; the renderer and the session only ever talk
//! to the trait, so a physical NAO, a console stand-in and the simulator are
//! interchangeable.

use std::time::Duration;

use teddy_types::{TeddyError, VoiceParams};

/// Joints used by the head-tracking behaviour.
pub const HEAD_CHAIN: &[&str] = &["Head"];
/// Joints used by arm gestures and motion playback.
pub const ARM_CHAIN: &[&str] = &["LArm", "RArm"];

/// A humanoid actuator surface.
///
/// # Blocking contract
///
/// [`speak`][Robot::speak] returns only once the utterance has finished.
/// [`gesture`][Robot::gesture] must return as soon as the animation has been
/// *issued*; callers rely on this to keep speech flowing while the robot
/// moves.
pub trait Robot: Send {
    /// Say `text` with the given voice parameters, blocking until done.
    ///
    /// # Errors
    ///
    /// Returns [`TeddyError::HardwareFault`] if the text-to-speech engine
    /// rejects the request.
    fn speak(&mut self, text: &str, voice: &VoiceParams) -> Result<(), TeddyError>;

    /// Start the animation registered under `name` (resolved to `animation`)
    /// without waiting for it to finish.
    fn gesture(&mut self, name: &str, animation: &str) -> Result<(), TeddyError>;

    /// Set motor stiffness (0.0 – 1.0) on the named joints or chains.
    fn set_stiffness(&mut self, joints: &[&str], level: f32) -> Result<(), TeddyError>;

    /// Leave the rest posture and enable autonomous life.
    fn wake_up(&mut self) -> Result<(), TeddyError>;

    /// Return to the safe crouching rest posture.
    fn rest(&mut self) -> Result<(), TeddyError>;

    /// Start (or keep) following the nearest face with the head.
    ///
    /// Optional capability; drivers without a tracker leave the default.
    fn track_face(&mut self) -> Result<(), TeddyError> {
        Ok(())
    }
}

/// Rough duration of an utterance at ~150 words per minute, never below one
/// second.
pub fn estimate_speech_time(text: &str) -> Duration {
    let words = text.split_whitespace().count() as f64;
    Duration::from_secs_f64((words * 0.4).max(1.0))
}
