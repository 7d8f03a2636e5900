//! Terminal stand-ins for the robot and the speech recogniser.
//!
//! [`ConsoleRobot`] prints what a NAO would say and do; [`LineTranscripts`]
//! treats each line typed by the operator as one recognised utterance.

use std::io::{self, Stdout, Write};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use colored::Colorize;
use teddy_hal::robot::Robot;
use teddy_hal::sensor::{SensorError, TranscriptSource};
use teddy_hal::estimate_speech_time;
use teddy_types::{TeddyError, VoiceParams};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader, Stdin};
use tracing::debug;

// ─────────────────────────────────────────────────────────────────────────────
// ConsoleRobot
// ─────────────────────────────────────────────────────────────────────────────

/// Prints speech and gestures instead of performing them.
pub struct ConsoleRobot<W = Stdout> {
    out: W,
    /// Sleep for the estimated speech time after each utterance.
    pace: bool,
}

impl ConsoleRobot<Stdout> {
    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl<W: Write + Send> ConsoleRobot<W> {
    pub fn new(out: W) -> Self {
        Self { out, pace: false }
    }

    pub fn with_pacing(mut self, pace: bool) -> Self {
        self.pace = pace;
        self
    }

    fn line(&mut self, text: impl std::fmt::Display) -> Result<(), TeddyError> {
        writeln!(self.out, "{text}").map_err(|e| TeddyError::hardware("console", e.to_string()))
    }
}

impl<W: Write + Send> Robot for ConsoleRobot<W> {
    fn speak(&mut self, text: &str, voice: &VoiceParams) -> Result<(), TeddyError> {
        let duration = estimate_speech_time(text);
        self.line(format!("  {} {}", "Robot:".bold().green(), text))?;
        self.line(
            format!(
                "         (pitch {}, shift {}, speed {}, ~{:.1}s)",
                voice.pitch,
                voice.pitch_shift,
                voice.speed,
                duration.as_secs_f64()
            )
            .dimmed(),
        )?;
        if self.pace {
            std::thread::sleep(duration);
        }
        Ok(())
    }

    fn gesture(&mut self, name: &str, animation: &str) -> Result<(), TeddyError> {
        debug!(name, animation, "gesture");
        self.line(format!("  {} {}", "*".magenta(), name.magenta().italic()))
    }

    fn set_stiffness(&mut self, joints: &[&str], level: f32) -> Result<(), TeddyError> {
        debug!(?joints, level, "stiffness");
        Ok(())
    }

    fn wake_up(&mut self) -> Result<(), TeddyError> {
        self.line("  Robot is awake.".cyan())
    }

    fn rest(&mut self) -> Result<(), TeddyError> {
        self.line("  Robot is resting.".cyan())
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// LineTranscripts
// ─────────────────────────────────────────────────────────────────────────────

/// How often a pending read checks the shutdown flag.
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

/// One line of input per utterance.  End of input closes the source, and so
/// does a raised shutdown flag while a read is pending.
pub struct LineTranscripts<R> {
    reader: R,
    prompt: bool,
    shutdown: Option<Arc<AtomicBool>>,
}

impl LineTranscripts<BufReader<Stdin>> {
    /// Read from the terminal, printing a listening prompt before each line.
    pub fn stdin() -> Self {
        let mut source = Self::new(BufReader::new(tokio::io::stdin()));
        source.prompt = true;
        source
    }
}

impl<R: AsyncBufRead + Unpin + Send> LineTranscripts<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            prompt: false,
            shutdown: None,
        }
    }

    /// Abandon a pending read once `flag` is raised.
    pub fn with_shutdown(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown = Some(flag);
        self
    }
}

async fn raised(flag: Option<&AtomicBool>) {
    match flag {
        Some(flag) => {
            while !flag.load(Ordering::SeqCst) {
                tokio::time::sleep(SHUTDOWN_POLL).await;
            }
        }
        None => std::future::pending().await,
    }
}

#[async_trait]
impl<R: AsyncBufRead + Unpin + Send> TranscriptSource for LineTranscripts<R> {
    async fn next_transcript(&mut self) -> Result<Option<String>, SensorError> {
        if self.prompt {
            print!("  {} ", "Listening… you:".bold().yellow());
            io::stdout().flush().ok();
        }
        let mut line = String::new();
        let read = tokio::select! {
            read = self.reader.read_line(&mut line) => read,
            _ = raised(self.shutdown.as_deref()) => {
                debug!("shutdown raised while listening");
                return Err(SensorError::Closed);
            }
        };
        match read {
            Ok(0) => Err(SensorError::Closed),
            Ok(_) => {
                let text = line.trim();
                Ok((!text.is_empty()).then(|| text.to_string()))
            }
            Err(e) => Err(SensorError::Device(e.to_string())),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Confirmation gate
// ─────────────────────────────────────────────────────────────────────────────

/// Block until the operator types `y` or `yes`.
///
/// Returns `false` if input ends first.
pub fn confirm(stage: &str, input: &mut impl io::BufRead, out: &mut impl Write) -> bool {
    let rule = "=".repeat(60);
    writeln!(out, "\n{rule}\n\n\tAre we ready for {stage}\n\n{rule}\n").ok();
    loop {
        write!(out, "Enter yes/y when ready: ").ok();
        out.flush().ok();
        let mut answer = String::new();
        match input.read_line(&mut answer) {
            Ok(0) | Err(_) => return false,
            Ok(_) => {}
        }
        if matches!(answer.trim_end_matches(['\r', '\n']), "y" | "yes") {
            return true;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn console_robot_prints_speech_and_gestures() {
        let mut buf = Vec::new();
        let mut robot = ConsoleRobot::new(&mut buf);
        robot.speak("Hello there.", &VoiceParams::default()).unwrap();
        robot.gesture("nod", "animations/Stand/Gestures/Yes_1").unwrap();
        drop(robot);
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("Hello there."));
        assert!(out.contains("speed 100"));
        assert!(out.contains("~1.0s"));
        assert!(out.contains("nod"));
    }

    #[test]
    fn console_robot_reports_speech_estimate() {
        let mut buf = Vec::new();
        let mut robot = ConsoleRobot::new(&mut buf);
        robot
            .speak("one two three four five", &VoiceParams::default())
            .unwrap();
        drop(robot);
        let out = String::from_utf8(buf).unwrap();
        assert!(out.contains("~2.0s"));
    }

    #[tokio::test]
    async fn line_transcripts_yield_lines_then_close() {
        let mut ears = LineTranscripts::new(&b"I feel strange\n\n  tired  \n"[..]);
        assert_eq!(
            ears.next_transcript().await.unwrap(),
            Some("I feel strange".to_string())
        );
        assert_eq!(ears.next_transcript().await.unwrap(), None);
        assert_eq!(ears.next_transcript().await.unwrap(), Some("tired".to_string()));
        assert!(matches!(
            ears.next_transcript().await,
            Err(SensorError::Closed)
        ));
    }

    #[tokio::test]
    async fn raised_shutdown_abandons_a_pending_read() {
        // Keep the writing half alive so the read never sees end of input.
        let (_typist, terminal) = tokio::io::duplex(64);
        let flag = Arc::new(AtomicBool::new(false));
        let mut ears = LineTranscripts::new(BufReader::new(terminal)).with_shutdown(flag.clone());

        let raiser = tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            flag.store(true, Ordering::SeqCst);
        });

        let result = tokio::time::timeout(Duration::from_secs(2), ears.next_transcript())
            .await
            .expect("read abandoned before the timeout");
        assert!(matches!(result, Err(SensorError::Closed)));
        raiser.await.unwrap();
    }

    #[tokio::test]
    async fn lines_already_typed_are_read_before_shutdown() {
        let flag = Arc::new(AtomicBool::new(false));
        let mut ears = LineTranscripts::new(&b"still here\n"[..]).with_shutdown(flag);
        assert_eq!(
            ears.next_transcript().await.unwrap(),
            Some("still here".to_string())
        );
    }

    #[test]
    fn confirm_waits_for_exact_yes() {
        let mut input = &b"no\nYES\nyep\ny\n"[..];
        let mut out = Vec::new();
        assert!(confirm("Part 1", &mut input, &mut out));
        let out = String::from_utf8(out).unwrap();
        assert!(out.contains("Are we ready for Part 1"));
        assert_eq!(out.matches("Enter yes/y when ready: ").count(), 4);
    }

    #[test]
    fn confirm_gives_up_at_end_of_input() {
        let mut input = &b"maybe\n"[..];
        let mut out = Vec::new();
        assert!(!confirm("Part 1", &mut input, &mut out));
    }
}
