//! In-process simulation drivers for tests and runs without a robot.
//!
//! [`SimRobot`] records every command it receives, in order, and can be told
//! to fail its next speech request.  [`ScriptedTranscripts`] replays a fixed
//! list of recogniser results and then reports [`SensorError::Closed`].
//!
//! # Example
//!
//! ```rust
//! use teddy_hal::robot::Robot;
//! use teddy_hal::sim::{RobotCommand, SimRobot};
//! use teddy_types::VoiceParams;
//!
//! let mut robot = SimRobot::new();
//! robot.wake_up().unwrap();
//! robot.speak("Hello", &VoiceParams::default()).unwrap();
//! assert_eq!(robot.commands().len(), 2);
//! assert!(matches!(robot.commands()[0], RobotCommand::WakeUp));
//! ```

use std::collections::VecDeque;

use async_trait::async_trait;
use teddy_types::{TeddyError, VoiceParams};
use tracing::debug;

use crate::robot::Robot;
use crate::sensor::{SensorError, TranscriptSource};

// ────────────────────────────────────────────────────────────────────────────
// Simulated robot
// ────────────────────────────────────────────────────────────────────────────

/// A command observed by [`SimRobot`].
#[derive(Debug, Clone, PartialEq)]
pub enum RobotCommand {
    Speak { text: String, voice: VoiceParams },
    Gesture { name: String, animation: String },
    Stiffness { joints: Vec<String>, level: f32 },
    WakeUp,
    Rest,
    TrackFace,
}

/// A robot that only remembers what it was told to do.
#[derive(Debug, Default)]
pub struct SimRobot {
    commands: Vec<RobotCommand>,
    fail_next_speech: bool,
}

impl SimRobot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`speak`][Robot::speak] call return a hardware fault.
    pub fn fail_next_speech(&mut self) {
        self.fail_next_speech = true;
    }

    /// Every command received so far, oldest first.
    pub fn commands(&self) -> &[RobotCommand] {
        &self.commands
    }

    /// Only the spoken texts, in order.
    pub fn spoken(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RobotCommand::Speak { text, .. } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Only the gesture names, in order.
    pub fn gestures(&self) -> Vec<&str> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                RobotCommand::Gesture { name, .. } => Some(name.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Number of times the robot was put to rest.
    pub fn rest_count(&self) -> usize {
        self.commands
            .iter()
            .filter(|c| matches!(c, RobotCommand::Rest))
            .count()
    }
}

impl Robot for SimRobot {
    fn speak(&mut self, text: &str, voice: &VoiceParams) -> Result<(), TeddyError> {
        if self.fail_next_speech {
            self.fail_next_speech = false;
            return Err(TeddyError::hardware("sim_tts", "injected speech failure"));
        }
        debug!(text, ?voice, "sim speak");
        self.commands.push(RobotCommand::Speak {
            text: text.to_string(),
            voice: *voice,
        });
        Ok(())
    }

    fn gesture(&mut self, name: &str, animation: &str) -> Result<(), TeddyError> {
        self.commands.push(RobotCommand::Gesture {
            name: name.to_string(),
            animation: animation.to_string(),
        });
        Ok(())
    }

    fn set_stiffness(&mut self, joints: &[&str], level: f32) -> Result<(), TeddyError> {
        self.commands.push(RobotCommand::Stiffness {
            joints: joints.iter().map(|j| j.to_string()).collect(),
            level,
        });
        Ok(())
    }

    fn wake_up(&mut self) -> Result<(), TeddyError> {
        self.commands.push(RobotCommand::WakeUp);
        Ok(())
    }

    fn rest(&mut self) -> Result<(), TeddyError> {
        self.commands.push(RobotCommand::Rest);
        Ok(())
    }

    fn track_face(&mut self) -> Result<(), TeddyError> {
        self.commands.push(RobotCommand::TrackFace);
        Ok(())
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Scripted transcripts
// ────────────────────────────────────────────────────────────────────────────

/// Replays recogniser results in order, then closes.
///
/// `None` entries stand for "heard nothing usable".
#[derive(Debug, Default)]
pub struct ScriptedTranscripts {
    script: VecDeque<Option<String>>,
    requests: usize,
}

impl ScriptedTranscripts {
    pub fn new<I, S>(script: I) -> Self
    where
        I: IntoIterator<Item = Option<S>>,
        S: Into<String>,
    {
        Self {
            script: script.into_iter().map(|s| s.map(Into::into)).collect(),
            requests: 0,
        }
    }

    /// Convenience constructor for a script with no silent entries.
    pub fn lines<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(lines.into_iter().map(Some))
    }

    /// How many times a transcript was requested.
    pub fn requests(&self) -> usize {
        self.requests
    }

    /// Entries not yet consumed.
    pub fn remaining(&self) -> usize {
        self.script.len()
    }
}

#[async_trait]
impl TranscriptSource for ScriptedTranscripts {
    async fn next_transcript(&mut self) -> Result<Option<String>, SensorError> {
        self.requests += 1;
        self.script.pop_front().ok_or(SensorError::Closed)
    }
}
