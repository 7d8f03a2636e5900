//! [`ConversationSession`] – the bounded, escalating conversation loop.
//!
//! One session is one performance.  Each turn:
//!
//! 1. **Listen** – point the head at the nearest face and wait for one
//!    transcript.  An empty or failed recognition consumes no turn.
//! 2. **Escalate** – draw this turn's intensity from the
//!    [`EscalationSchedule`] and look up its style descriptor.
//! 3. **Prompt** – combine persona, style, recent exchanges, grammar
//!    instructions and the new input into one prompt.
//! 4. **Query** – ask the oracle via [`QueryClient`], optionally playing a
//!    "thinking" gesture while the request is in flight.  An exhausted query
//!    skips the turn without advancing the counter.
//! 5. **Render** – parse directives and dispatch speech, gestures and voice
//!    changes to the robot in order.
//! 6. **Record** – append the exchange to the chat log and to the in-memory
//!    context, then advance the turn counter.
//!
//! The loop ends after `max_turns` completed turns, when the transcript
//! source closes, or when the shared shutdown flag is raised.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::{Arc, atomic::AtomicBool};
//! use std::time::Duration;
//!
//! use teddy_hal::GestureLibrary;
//! use teddy_hal::sim::{ScriptedTranscripts, SimRobot};
//! use teddy_runtime::oracle::HttpOracle;
//! use teddy_runtime::session::{ConversationSession, SessionConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let oracle = HttpOracle::new("http://localhost:5000/generate", Duration::from_secs(30))?;
//! let shutdown = Arc::new(AtomicBool::new(false));
//! let mut session = ConversationSession::new(
//!     SessionConfig::default(),
//!     oracle,
//!     GestureLibrary::nao_defaults(),
//!     shutdown,
//! )?;
//!
//! let mut robot = SimRobot::new();
//! let mut ears = ScriptedTranscripts::lines(["I can't sleep."]);
//! let summary = session.perform(&mut ears, &mut robot, |_stage| true).await?;
//! println!("{} turns", summary.turns_completed);
//! # Ok(())
//! # }
//! ```

use std::fmt;
use std::path::PathBuf;
use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use rand::{Rng, SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use teddy_hal::robot::{ARM_CHAIN, HEAD_CHAIN};
use teddy_hal::{GestureLibrary, Robot, SensorError, TranscriptSource};
use teddy_memory::{ChatLog, ConversationContext, TurnRecord};
use teddy_types::{TeddyError, VoiceParams};
use tracing::{Instrument, debug, error, info, info_span, warn};
use uuid::Uuid;

use crate::directive::{DirectiveGrammar, GrammarKind, UnknownDirectivePolicy};
use crate::escalation::{EscalationSchedule, describe};
use crate::oracle::Oracle;
use crate::prompt::{DEFAULT_PERSONA, PromptBuilder};
use crate::query::{QueryClient, QueryError, RetryPolicy};
use crate::render::Renderer;

// ─────────────────────────────────────────────────────────────────────────────
// Constants
// ─────────────────────────────────────────────────────────────────────────────

/// Stiffness applied to the head before the first turn.
const HEAD_STIFFNESS: f32 = 1.0;

/// Stiffness applied to the arms before the thinking gesture.
const ARM_STIFFNESS: f32 = 0.7;

/// Gate passed before the conversation starts.
pub const OPENING_STAGE: &str = "Part 1";

/// Gate passed after the conversation, before the robot rests.
pub const CLOSING_STAGE: &str = "Part 2";

// ─────────────────────────────────────────────────────────────────────────────
// Configuration
// ─────────────────────────────────────────────────────────────────────────────

/// What happens to the user's input when the oracle never answers usefully.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailedQueryPolicy {
    /// Discard the input and listen again.
    #[default]
    FetchNewInput,
    /// Retry the same input on the next loop iteration, at most
    /// [`SessionConfig::max_input_reuses`] times.
    ReuseInput,
}

/// Configuration bundle for [`ConversationSession`].
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Completed turns after which the session ends.
    pub max_turns: usize,
    /// Number of recent exchanges included in each prompt.
    pub context_window: usize,
    /// Opening sentence of every prompt.
    pub persona: String,
    /// Speaker label for the human in prompts.
    pub user_label: String,
    /// Speaker label for the robot in prompts.
    pub robot_label: String,
    /// Directive annotation style the model is taught.
    pub grammar: GrammarKind,
    /// Handling of unknown directives; `None` uses the grammar's default.
    pub unknown_directive: Option<UnknownDirectivePolicy>,
    pub failed_query: FailedQueryPolicy,
    /// Retries of one input under [`FailedQueryPolicy::ReuseInput`] before
    /// the session listens again.
    pub max_input_reuses: u32,
    pub retry: RetryPolicy,
    pub schedule: EscalationSchedule,
    /// Directory for the numbered chat log.  `None` disables the log.
    pub chat_dir: Option<PathBuf>,
    /// Gesture played while waiting for the oracle.  Must exist in the
    /// gesture library.
    pub thinking_gesture: Option<String>,
    /// Voice every response starts with.
    pub default_voice: VoiceParams,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            max_turns: 13,
            context_window: 5,
            persona: DEFAULT_PERSONA.to_string(),
            user_label: "Patient".to_string(),
            robot_label: "Therapist".to_string(),
            grammar: GrammarKind::default(),
            unknown_directive: None,
            failed_query: FailedQueryPolicy::default(),
            max_input_reuses: 1,
            retry: RetryPolicy::default(),
            schedule: EscalationSchedule::default(),
            chat_dir: None,
            thinking_gesture: None,
            default_voice: VoiceParams::default(),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Turn state
// ─────────────────────────────────────────────────────────────────────────────

/// The phase a session is currently in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    AwaitingInput,
    Escalating,
    Prompting,
    Querying,
    Sanitizing,
    Rendering,
    Logging,
    Terminated,
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TurnState::AwaitingInput => "awaiting_input",
            TurnState::Escalating => "escalating",
            TurnState::Prompting => "prompting",
            TurnState::Querying => "querying",
            TurnState::Sanitizing => "sanitizing",
            TurnState::Rendering => "rendering",
            TurnState::Logging => "logging",
            TurnState::Terminated => "terminated",
        };
        f.write_str(name)
    }
}

/// How one loop iteration ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnOutcome {
    Completed,
    NoInput,
    Skipped,
    InputClosed,
    Cancelled,
}

/// Totals reported when a session ends.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSummary {
    pub turns_completed: usize,
    /// Turns abandoned because every oracle attempt failed.
    pub turns_skipped: usize,
    /// Listening rounds that produced no transcript.
    pub empty_inputs: usize,
    /// Directives dropped or spoken literally.
    pub directive_diagnostics: usize,
    /// Intensity of each completed turn, in order.
    pub intensities: Vec<u8>,
}

// ─────────────────────────────────────────────────────────────────────────────
// ConversationSession
// ─────────────────────────────────────────────────────────────────────────────

/// Drives one performance from wake-up to rest.
pub struct ConversationSession<O, R = StdRng> {
    id: Uuid,
    max_turns: usize,
    failed_query: FailedQueryPolicy,
    max_input_reuses: u32,
    thinking_gesture: Option<String>,
    schedule: EscalationSchedule,
    prompt: PromptBuilder,
    query: QueryClient<O>,
    grammar: Box<dyn DirectiveGrammar>,
    library: GestureLibrary,
    renderer: Renderer,
    context: ConversationContext,
    chat_log: Option<ChatLog>,
    rng: R,
    shutdown: Arc<AtomicBool>,
    // ── loop state ────────────────────────────────────────────────────────────
    turn: usize,
    state: TurnState,
    /// Input carried over from a failed query under
    /// [`FailedQueryPolicy::ReuseInput`], with how often it was reused.
    pending_input: Option<(String, u32)>,
    summary: SessionSummary,
}

impl<O: Oracle> ConversationSession<O, StdRng> {
    /// Build a session with an entropy-seeded random source.
    ///
    /// # Errors
    ///
    /// See [`ConversationSession::with_rng`].
    pub fn new(
        config: SessionConfig,
        oracle: O,
        library: GestureLibrary,
        shutdown: Arc<AtomicBool>,
    ) -> Result<Self, TeddyError> {
        Self::with_rng(config, oracle, library, shutdown, StdRng::from_entropy())
    }
}

impl<O: Oracle, R: Rng + Send> ConversationSession<O, R> {
    /// Build a session drawing intensities from `rng`.
    ///
    /// # Errors
    ///
    /// - [`TeddyError::Configuration`] if the grammar cannot be built or the
    ///   thinking gesture is not in `library`.
    /// - [`TeddyError::ChatLog`] if the chat log cannot be created.
    pub fn with_rng(
        config: SessionConfig,
        oracle: O,
        library: GestureLibrary,
        shutdown: Arc<AtomicBool>,
        rng: R,
    ) -> Result<Self, TeddyError> {
        let grammar = config
            .grammar
            .build(config.unknown_directive)
            .map_err(|e| TeddyError::Configuration(format!("grammar {}: {e}", config.grammar)))?;

        if let Some(name) = &config.thinking_gesture {
            if !library.contains(name) {
                return Err(TeddyError::Configuration(format!(
                    "thinking gesture '{name}' is not in the gesture library"
                )));
            }
        }

        let id = Uuid::new_v4();
        let chat_log = match &config.chat_dir {
            Some(dir) => {
                let log = ChatLog::create(dir, &id.to_string())
                    .map_err(|e| TeddyError::ChatLog(e.to_string()))?;
                info!(path = %log.path().display(), "chat log opened");
                Some(log)
            }
            None => None,
        };

        Ok(Self {
            id,
            max_turns: config.max_turns,
            failed_query: config.failed_query,
            max_input_reuses: config.max_input_reuses,
            thinking_gesture: config.thinking_gesture,
            schedule: config.schedule,
            prompt: PromptBuilder::new(
                config.persona,
                config.user_label.clone(),
                config.robot_label.clone(),
                config.context_window,
            ),
            query: QueryClient::new(oracle, config.retry),
            grammar,
            library,
            renderer: Renderer::new(config.default_voice),
            context: ConversationContext::with_labels(config.user_label, config.robot_label),
            chat_log,
            rng,
            shutdown,
            turn: 0,
            state: TurnState::AwaitingInput,
            pending_input: None,
            summary: SessionSummary::default(),
        })
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Completed turns so far.
    pub fn turn(&self) -> usize {
        self.turn
    }

    pub fn state(&self) -> TurnState {
        self.state
    }

    pub fn context(&self) -> &ConversationContext {
        &self.context
    }

    pub fn chat_log(&self) -> Option<&ChatLog> {
        self.chat_log.as_ref()
    }

    pub fn query_client(&self) -> &QueryClient<O> {
        &self.query
    }

    /// Wake the robot, wait for the operator, run the conversation, and put
    /// the robot to rest.
    ///
    /// `gate` is called with [`OPENING_STAGE`] after wake-up; returning
    /// `false` skips the conversation.  After a conversation that was not
    /// cut short by shutdown it is called again with [`CLOSING_STAGE`], and
    /// the robot stays awake until it returns.  The robot is rested exactly
    /// once on every path, including errors.
    ///
    /// # Errors
    ///
    /// Propagates the first hardware or chat-log error; a failure to rest is
    /// only logged.
    pub async fn perform<F>(
        &mut self,
        sensor: &mut dyn TranscriptSource,
        robot: &mut dyn Robot,
        gate: F,
    ) -> Result<SessionSummary, TeddyError>
    where
        F: FnMut(&str) -> bool,
    {
        let result = self.wake_and_run(sensor, robot, gate).await;
        if let Err(e) = &result {
            error!(error = %e, "session aborted");
        }
        if let Err(e) = robot.rest() {
            warn!(error = %e, "failed to put the robot to rest");
        }
        self.state = TurnState::Terminated;
        result
    }

    async fn wake_and_run<F>(
        &mut self,
        sensor: &mut dyn TranscriptSource,
        robot: &mut dyn Robot,
        mut gate: F,
    ) -> Result<SessionSummary, TeddyError>
    where
        F: FnMut(&str) -> bool,
    {
        robot.wake_up()?;
        info!("robot awake");
        if !gate(OPENING_STAGE) {
            info!("operator did not confirm, skipping the conversation");
            return Ok(self.summary.clone());
        }
        let summary = self.run(sensor, robot).await?;
        if !self.shutdown.load(Ordering::SeqCst) && !gate(CLOSING_STAGE) {
            info!("closing gate not confirmed");
        }
        Ok(summary)
    }

    /// Run turns until the turn limit, input closes, or shutdown is raised.
    ///
    /// Does not wake or rest the robot; see [`perform`][Self::perform].
    ///
    /// # Errors
    ///
    /// Hardware faults from the robot and chat-log write failures end the
    /// session immediately.
    pub async fn run(
        &mut self,
        sensor: &mut dyn TranscriptSource,
        robot: &mut dyn Robot,
    ) -> Result<SessionSummary, TeddyError> {
        let span = info_span!("session", id = %self.id);
        self.run_turns(sensor, robot).instrument(span).await
    }

    async fn run_turns(
        &mut self,
        sensor: &mut dyn TranscriptSource,
        robot: &mut dyn Robot,
    ) -> Result<SessionSummary, TeddyError> {
        robot.set_stiffness(HEAD_CHAIN, HEAD_STIFFNESS)?;
        info!(
            max_turns = self.max_turns,
            grammar = self.grammar.name(),
            "conversation started"
        );

        while self.turn < self.max_turns {
            if self.shutdown.load(Ordering::SeqCst) {
                info!("shutdown requested");
                break;
            }
            match self.step(sensor, robot).await? {
                TurnOutcome::Completed => {}
                TurnOutcome::NoInput => self.summary.empty_inputs += 1,
                TurnOutcome::Skipped => self.summary.turns_skipped += 1,
                TurnOutcome::InputClosed => {
                    info!("transcript source closed");
                    break;
                }
                TurnOutcome::Cancelled => {
                    info!("query cancelled by shutdown");
                    break;
                }
            }
        }

        self.state = TurnState::Terminated;
        info!(
            turns = self.summary.turns_completed,
            skipped = self.summary.turns_skipped,
            "conversation ended"
        );
        Ok(self.summary.clone())
    }

    /// One loop iteration.
    async fn step(
        &mut self,
        sensor: &mut dyn TranscriptSource,
        robot: &mut dyn Robot,
    ) -> Result<TurnOutcome, TeddyError> {
        // ── Listen ────────────────────────────────────────────────────────────
        self.enter(TurnState::AwaitingInput);
        robot.track_face()?;
        let (input, reuses) = match self.pending_input.take() {
            Some((input, reuses)) => {
                info!(reuses, "re-using previous input");
                (input, reuses)
            }
            None => match sensor.next_transcript().await {
                Ok(Some(text)) if !text.trim().is_empty() => (text.trim().to_string(), 0),
                Ok(_) => {
                    warn!("no transcript received");
                    return Ok(TurnOutcome::NoInput);
                }
                Err(SensorError::Closed) => return Ok(TurnOutcome::InputClosed),
                Err(e) => {
                    warn!(error = %e, "speech recognition failed");
                    return Ok(TurnOutcome::NoInput);
                }
            },
        };
        info!(turn = self.turn, input = %input, "user said");

        // ── Escalate ──────────────────────────────────────────────────────────
        self.enter(TurnState::Escalating);
        let intensity = self.schedule.intensity_for(self.turn, &mut self.rng);
        let style = describe(intensity);
        info!(intensity, style, "craziness level");

        // ── Prompt ────────────────────────────────────────────────────────────
        self.enter(TurnState::Prompting);
        let help = self.grammar.describe(&self.library);
        let prompt = self.prompt.build(style, &self.context, &help, &input);

        // ── Query ─────────────────────────────────────────────────────────────
        self.enter(TurnState::Querying);
        self.play_thinking_gesture(robot)?;
        let response = match self.query.query(&prompt, intensity, &self.shutdown).await {
            Ok(text) => text,
            Err(QueryError::Cancelled) => return Ok(TurnOutcome::Cancelled),
            Err(e) => {
                warn!(error = %e, "skipping turn");
                if self.failed_query == FailedQueryPolicy::ReuseInput {
                    if reuses < self.max_input_reuses {
                        self.pending_input = Some((input, reuses + 1));
                    } else {
                        warn!(reuses, "input reused too often, listening again");
                    }
                }
                let backoff = self.query.policy().backoff;
                if !backoff.is_zero() {
                    tokio::time::sleep(backoff).await;
                }
                return Ok(TurnOutcome::Skipped);
            }
        };

        // ── Parse and render ──────────────────────────────────────────────────
        self.enter(TurnState::Sanitizing);
        let parsed = self.grammar.parse(&response, &self.library);
        for diagnostic in &parsed.diagnostics {
            warn!(%diagnostic, "directive not performed");
        }
        self.summary.directive_diagnostics += parsed.diagnostics.len();

        self.enter(TurnState::Rendering);
        info!(response = %response, "robot response");
        let report = self.renderer.render(&parsed.segments, &self.library, robot)?;
        debug!(?report, "response rendered");

        // ── Record ────────────────────────────────────────────────────────────
        self.enter(TurnState::Logging);
        if let Some(log) = &self.chat_log {
            log.append(&TurnRecord {
                intensity,
                user_input: &input,
                robot_response: &response,
            })
            .map_err(|e| TeddyError::ChatLog(e.to_string()))?;
        }
        self.context.push(input, parsed.spoken_text());

        self.turn += 1;
        self.summary.turns_completed = self.turn;
        self.summary.intensities.push(intensity);
        Ok(TurnOutcome::Completed)
    }

    fn play_thinking_gesture(&self, robot: &mut dyn Robot) -> Result<(), TeddyError> {
        let Some(name) = &self.thinking_gesture else {
            return Ok(());
        };
        if let Some(animation) = self.library.animation(name) {
            robot.set_stiffness(ARM_CHAIN, ARM_STIFFNESS)?;
            robot.gesture(name, animation)?;
        }
        Ok(())
    }

    fn enter(&mut self, state: TurnState) {
        debug!(from = %self.state, to = %state, "state transition");
        self.state = state;
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
