//! `teddy-runtime` – the conversation engine.
//!
//! Turns what the user said into what the robot says and does, one bounded
//! turn at a time, getting a little less sane on each turn.
//!
//! # Modules
//!
//! - [`session`] – [`ConversationSession`]: the turn loop.  Listens, picks
//!   the turn's intensity, builds the prompt, queries the oracle, renders the
//!   reply, and records the exchange.
//! - [`escalation`] – [`EscalationSchedule`]: turn → intensity band, and the
//!   style descriptor for each intensity level.
//! - [`prompt`] – [`PromptBuilder`].
//! - [`oracle`] – the [`Oracle`] trait and its HTTP implementation
//!   [`HttpOracle`].
//! - [`query`] – [`QueryClient`]: bounded retries, sanitizing, and the
//!   minimum-length check.
//! - [`sanitizer`] – quote stripping and trailing-fragment removal.
//! - [`directive`] – the pluggable [`DirectiveGrammar`]s that split a reply
//!   into speech, gesture and voice segments.
//! - [`render`] – [`Renderer`]: dispatches segments to a
//!   [`Robot`][teddy_hal::Robot].
//! - [`telemetry`] – [`init_tracing`].

pub mod directive;
pub mod escalation;
pub mod oracle;
pub mod prompt;
pub mod query;
pub mod render;
pub mod sanitizer;
pub mod session;
pub mod telemetry;

#[cfg(test)]
pub(crate) mod test_support;

pub use directive::{
    Diagnostic, DirectiveGrammar, GrammarKind, ParsedResponse, UnknownDirectivePolicy,
};
pub use escalation::{EscalationSchedule, ScheduleError, describe};
pub use oracle::{HttpOracle, Oracle, OracleError};
pub use prompt::PromptBuilder;
pub use query::{QueryClient, QueryError, RetryPolicy};
pub use render::{RenderReport, Renderer};
pub use sanitizer::sanitize;
pub use session::{
    ConversationSession, FailedQueryPolicy, SessionConfig, SessionSummary, TurnState,
};
pub use telemetry::{TracerProviderGuard, init_tracing};
