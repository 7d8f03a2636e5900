//! `teddy-hal` – the robot's edges.
//!
//! Everything the conversation runtime touches outside its own process is
//! reached through a trait defined here, so the NAO SDK, a console stand-in,
//! or a recording simulator can be swapped without touching the turn loop.
//!
//! # Modules
//!
//! - [`robot`] – [`Robot`][robot::Robot]: speech (blocking), gestures
//!   (fire-and-forget), stiffness, wake-up and rest.
//! - [`sensor`] – [`TranscriptSource`][sensor::TranscriptSource]: suspends
//!   until an utterance has been transcribed.
//! - [`registry`] – [`GestureLibrary`][registry::GestureLibrary]: the fixed
//!   gesture-name → animation-path table the directive parser validates
//!   against.
//! - [`sim`] – in-process drivers that record commands and replay scripted
//!   transcripts, for tests and headless runs.

pub mod registry;
pub mod robot;
pub mod sensor;
pub mod sim;

pub use registry::GestureLibrary;
pub use robot::{Robot, estimate_speech_time};
pub use sensor::{SensorError, TranscriptSource};
