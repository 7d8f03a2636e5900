//! `teddy-memory` – what the robot remembers within one session.
//!
//! # Modules
//!
//! - [`context`] – [`ConversationContext`][context::ConversationContext]:
//!   the append-only list of exchanges, of which only the most recent few are
//!   replayed into each prompt.  Never persisted.
//! - [`chat_log`] – [`ChatLog`][chat_log::ChatLog]: the sequentially numbered
//!   plain-text transcript written for every session.

pub mod chat_log;
pub mod context;

pub use chat_log::{ChatLog, ChatLogError, TurnRecord};
pub use context::{ConversationContext, Exchange};
