//! Directive grammars – parsing annotated model output into [`Segment`]s.
//!
//! The model is asked to interleave spoken text with directives.  Two
//! annotation styles exist and either can be selected per deployment through
//! [`GrammarKind`]:
//!
//! | Grammar | Gesture | Voice |
//! |---|---|---|
//! | [`BracketedGrammar`] | `[GESTURE: nod]` | `[VOICE: 90, 2.5, 120]` |
//! | [`DelimitedGrammar`] | `@@nod@@` | – |
//!
//! Both scan left to right and keep the source order of text and directives.
//! Problems never abort a parse: an unknown gesture, an unrecognised tag or a
//! malformed voice triple is reported as a [`Diagnostic`] and handled
//! according to [`UnknownDirectivePolicy`] (unknown names) or skipped
//! (malformed voice triples).
//!
//! # Example
//!
//! ```rust
//! use teddy_hal::GestureLibrary;
//! use teddy_runtime::directive::{BracketedGrammar, DirectiveGrammar, UnknownDirectivePolicy};
//! use teddy_types::{Segment, VoiceParams};
//!
//! let grammar = BracketedGrammar::new(UnknownDirectivePolicy::Drop).unwrap();
//! let library: GestureLibrary = [("nod", "animations/Stand/Gestures/Yes_1")].into_iter().collect();
//!
//! let parsed = grammar.parse("Hello [GESTURE: nod] there [VOICE: 90, 2.5, 120] friend", &library);
//! assert_eq!(parsed.segments, vec![
//!     Segment::text("Hello"),
//!     Segment::gesture("nod"),
//!     Segment::text("there"),
//!     Segment::Voice(VoiceParams::new(90.0, 2.5, 120.0)),
//!     Segment::text("friend"),
//! ]);
//! ```

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};
use teddy_hal::GestureLibrary;
use teddy_types::{PITCH_RANGE, PITCH_SHIFT_RANGE, SPEED_RANGE, Segment, VoiceParams};

// ─────────────────────────────────────────────────────────────────────────────
// Policies and diagnostics
// ─────────────────────────────────────────────────────────────────────────────

/// What to do with a directive whose name is not in the gesture library.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownDirectivePolicy {
    /// Remove the directive; surrounding text is kept as separate spans.
    Drop,
    /// Speak the directive verbatim, delimiters included, as part of the
    /// surrounding text.
    SpeakLiteral,
}

/// A non-fatal problem found while parsing one response.
#[derive(Debug, Clone, PartialEq)]
pub enum Diagnostic {
    UnknownGesture { name: String },
    UnknownTag { raw: String },
    MalformedVoice { raw: String, reason: String },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Diagnostic::UnknownGesture { name } => write!(f, "unknown gesture '{name}'"),
            Diagnostic::UnknownTag { raw } => write!(f, "unrecognised tag '{raw}'"),
            Diagnostic::MalformedVoice { raw, reason } => {
                write!(f, "malformed voice directive '{raw}': {reason}")
            }
        }
    }
}

/// Ordered segments plus everything that was dropped or reinterpreted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedResponse {
    pub segments: Vec<Segment>,
    pub diagnostics: Vec<Diagnostic>,
}

impl ParsedResponse {
    /// The spoken text only, joined with single spaces.
    pub fn spoken_text(&self) -> String {
        self.segments
            .iter()
            .filter_map(|s| match s {
                Segment::Text(t) => Some(t.as_str()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join(" ")
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Grammar trait
// ─────────────────────────────────────────────────────────────────────────────

/// A tokenizer for one directive annotation style.
pub trait DirectiveGrammar: Send + Sync {
    /// Short identifier used in logs and config (`"bracketed"`, `"delimited"`).
    fn name(&self) -> &'static str;

    /// Split `text` into segments, validating gestures against `library`.
    fn parse(&self, text: &str, library: &GestureLibrary) -> ParsedResponse;

    /// Prompt instructions teaching the model this grammar and the legal
    /// gesture names.
    fn describe(&self, library: &GestureLibrary) -> String;
}

/// The available grammars, as selected in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GrammarKind {
    #[default]
    Bracketed,
    Delimited,
}

impl GrammarKind {
    /// The policy this grammar applies when none is configured.
    pub fn default_policy(self) -> UnknownDirectivePolicy {
        match self {
            GrammarKind::Bracketed => UnknownDirectivePolicy::Drop,
            GrammarKind::Delimited => UnknownDirectivePolicy::SpeakLiteral,
        }
    }

    /// Build the grammar, using `policy` or the grammar's default.
    ///
    /// # Errors
    ///
    /// Returns [`regex::Error`] if the delimiter pattern fails to compile.
    pub fn build(
        self,
        policy: Option<UnknownDirectivePolicy>,
    ) -> Result<Box<dyn DirectiveGrammar>, regex::Error> {
        let policy = policy.unwrap_or_else(|| self.default_policy());
        Ok(match self {
            GrammarKind::Bracketed => Box::new(BracketedGrammar::new(policy)?),
            GrammarKind::Delimited => Box::new(DelimitedGrammar::new(policy)?),
        })
    }
}

impl fmt::Display for GrammarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GrammarKind::Bracketed => write!(f, "bracketed"),
            GrammarKind::Delimited => write!(f, "delimited"),
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Segment assembly
// ─────────────────────────────────────────────────────────────────────────────

/// Accumulates text between directives so literal directives can merge with
/// their neighbours.
#[derive(Default)]
struct Assembler {
    pending: String,
    out: ParsedResponse,
}

impl Assembler {
    fn text(&mut self, s: &str) {
        self.pending.push_str(s);
    }

    fn flush(&mut self) {
        let trimmed = self.pending.trim();
        if !trimmed.is_empty() {
            self.out.segments.push(Segment::text(trimmed));
        }
        self.pending.clear();
    }

    fn directive(&mut self, segment: Segment) {
        self.flush();
        self.out.segments.push(segment);
    }

    fn unknown(&mut self, policy: UnknownDirectivePolicy, raw: &str, diagnostic: Diagnostic) {
        self.out.diagnostics.push(diagnostic);
        match policy {
            UnknownDirectivePolicy::Drop => self.flush(),
            UnknownDirectivePolicy::SpeakLiteral => self.text(raw),
        }
    }

    fn diagnose(&mut self, diagnostic: Diagnostic) {
        self.flush();
        self.out.diagnostics.push(diagnostic);
    }

    fn finish(mut self) -> ParsedResponse {
        self.flush();
        self.out
    }
}

fn gesture_list(library: &GestureLibrary) -> String {
    library.names().collect::<Vec<_>>().join(", ")
}

// ─────────────────────────────────────────────────────────────────────────────
// Bracketed grammar
// ─────────────────────────────────────────────────────────────────────────────

/// `[GESTURE: name]` and `[VOICE: pitch, pitch_shift, speed]` tags.
///
/// Tag keywords are case-insensitive; gesture names are matched lower-cased.
/// Any other bracketed span is an unrecognised tag and follows the unknown
/// policy.
pub struct BracketedGrammar {
    policy: UnknownDirectivePolicy,
    tag: Regex,
}

impl BracketedGrammar {
    pub fn new(policy: UnknownDirectivePolicy) -> Result<Self, regex::Error> {
        Ok(Self {
            policy,
            tag: Regex::new(r"\[([^\[\]]*)\]")?,
        })
    }

    fn classify(&self, raw: &str, inner: &str, library: &GestureLibrary, asm: &mut Assembler) {
        let Some((keyword, arg)) = inner.split_once(':') else {
            asm.unknown(self.policy, raw, Diagnostic::UnknownTag { raw: raw.to_string() });
            return;
        };

        match keyword.trim().to_ascii_uppercase().as_str() {
            "GESTURE" => {
                let name = arg.trim().to_lowercase();
                if library.contains(&name) {
                    asm.directive(Segment::Gesture(name));
                } else {
                    asm.unknown(self.policy, raw, Diagnostic::UnknownGesture { name });
                }
            }
            "VOICE" => match parse_voice(arg) {
                Ok(params) => asm.directive(Segment::Voice(params)),
                Err(reason) => asm.diagnose(Diagnostic::MalformedVoice {
                    raw: raw.to_string(),
                    reason,
                }),
            },
            _ => asm.unknown(self.policy, raw, Diagnostic::UnknownTag { raw: raw.to_string() }),
        }
    }
}

/// Parse `"p, s, v"` into voice parameters.
fn parse_voice(arg: &str) -> Result<VoiceParams, String> {
    let fields: Vec<&str> = arg.split(',').map(str::trim).collect();
    if fields.len() != 3 {
        return Err(format!("expected 3 values, found {}", fields.len()));
    }
    let mut values = [0.0f32; 3];
    for (slot, field) in values.iter_mut().zip(&fields) {
        *slot = field
            .parse::<f32>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| format!("'{field}' is not a number"))?;
    }
    Ok(VoiceParams::new(values[0], values[1], values[2]))
}

fn unclosed_tag(raw: &str) -> Diagnostic {
    let keyword = raw[1..].split(':').next().unwrap_or_default().trim();
    if keyword.eq_ignore_ascii_case("VOICE") {
        Diagnostic::MalformedVoice {
            raw: raw.to_string(),
            reason: "tag is not closed".to_string(),
        }
    } else {
        Diagnostic::UnknownTag {
            raw: raw.to_string(),
        }
    }
}

impl DirectiveGrammar for BracketedGrammar {
    fn name(&self) -> &'static str {
        "bracketed"
    }

    fn parse(&self, text: &str, library: &GestureLibrary) -> ParsedResponse {
        let mut asm = Assembler::default();
        let mut last = 0;
        for caps in self.tag.captures_iter(text) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            asm.text(&text[last..whole.start()]);
            self.classify(whole.as_str(), inner.as_str(), library, &mut asm);
            last = whole.end();
        }
        let rest = &text[last..];
        match rest.find('[') {
            // No complete tag follows, so this one was never closed.
            Some(open) => {
                asm.text(&rest[..open]);
                asm.diagnose(unclosed_tag(&rest[open..]));
            }
            None => asm.text(rest),
        }
        asm.finish()
    }

    fn describe(&self, library: &GestureLibrary) -> String {
        format!(
            "Annotate your reply with directives in square brackets.\n\
             - [GESTURE: name] plays a gesture at that point. Allowed names: {}.\n\
             - [VOICE: pitch, pitch_shift, speed] changes your voice for the rest of the reply \
             (pitch {}-{}, pitch_shift {}-{}, speed {}-{}).\n\
             Do not use any other bracketed text.",
            gesture_list(library),
            PITCH_RANGE.0,
            PITCH_RANGE.1,
            PITCH_SHIFT_RANGE.0,
            PITCH_SHIFT_RANGE.1,
            SPEED_RANGE.0,
            SPEED_RANGE.1,
        )
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Delimited grammar
// ─────────────────────────────────────────────────────────────────────────────

/// Bare `@@name@@` gesture markers, `name` matching `[a-z0-9_]+`.
///
/// A marker is a gesture only if its name is registered; otherwise it follows
/// the unknown policy (by default spoken literally).
pub struct DelimitedGrammar {
    policy: UnknownDirectivePolicy,
    marker: Regex,
}

impl DelimitedGrammar {
    pub fn new(policy: UnknownDirectivePolicy) -> Result<Self, regex::Error> {
        Ok(Self {
            policy,
            marker: Regex::new(r"@@([a-z0-9_]+)@@")?,
        })
    }
}

impl DirectiveGrammar for DelimitedGrammar {
    fn name(&self) -> &'static str {
        "delimited"
    }

    fn parse(&self, text: &str, library: &GestureLibrary) -> ParsedResponse {
        let mut asm = Assembler::default();
        let mut last = 0;
        for caps in self.marker.captures_iter(text) {
            let (Some(whole), Some(name)) = (caps.get(0), caps.get(1)) else {
                continue;
            };
            asm.text(&text[last..whole.start()]);
            if library.contains(name.as_str()) {
                asm.directive(Segment::gesture(name.as_str()));
            } else {
                asm.unknown(
                    self.policy,
                    whole.as_str(),
                    Diagnostic::UnknownGesture {
                        name: name.as_str().to_string(),
                    },
                );
            }
            last = whole.end();
        }
        asm.text(&text[last..]);
        asm.finish()
    }

    fn describe(&self, library: &GestureLibrary) -> String {
        format!(
            "To move while you speak, insert a gesture marker of the form @@name@@ \
             where the gesture should start. Allowed names: {}.\n\
             Use only these names, in lower case, and no other markup.",
            gesture_list(library),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn library() -> GestureLibrary {
        [
            ("nod", "animations/Stand/Gestures/Yes_1"),
            ("dance", "animations/Stand/Emotions/Positive/Hysterical_1"),
        ]
        .into_iter()
        .collect()
    }

    fn bracketed() -> BracketedGrammar {
        BracketedGrammar::new(UnknownDirectivePolicy::Drop).unwrap()
    }

    fn delimited() -> DelimitedGrammar {
        DelimitedGrammar::new(UnknownDirectivePolicy::SpeakLiteral).unwrap()
    }

    // ── Bracketed ─────────────────────────────────────────────────────────

    #[test]
    fn bracketed_interleaves_text_gesture_and_voice() {
        let parsed = bracketed().parse(
            "Hello [GESTURE: nod] there [VOICE: 90, 2.5, 120] friend",
            &library(),
        );
        assert_eq!(
            parsed.segments,
            vec![
                Segment::text("Hello"),
                Segment::gesture("nod"),
                Segment::text("there"),
                Segment::Voice(VoiceParams::new(90.0, 2.5, 120.0)),
                Segment::text("friend"),
            ]
        );
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn bracketed_unknown_gesture_is_dropped_text_kept() {
        let parsed = bracketed().parse("Hello [GESTURE: flibber] there", &library());
        assert_eq!(
            parsed.segments,
            vec![Segment::text("Hello"), Segment::text("there")]
        );
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::UnknownGesture {
                name: "flibber".to_string()
            }]
        );
    }

    #[test]
    fn bracketed_keywords_are_case_insensitive() {
        let parsed = bracketed().parse("[gesture: NOD] Yes.", &library());
        assert_eq!(
            parsed.segments,
            vec![Segment::gesture("nod"), Segment::text("Yes.")]
        );
    }

    #[test]
    fn bracketed_malformed_voice_is_skipped() {
        let parsed = bracketed().parse("A [VOICE: 90, fast, 120] B [VOICE: 1, 2] C", &library());
        assert_eq!(
            parsed.segments,
            vec![Segment::text("A"), Segment::text("B"), Segment::text("C")]
        );
        assert_eq!(parsed.diagnostics.len(), 2);
        assert!(matches!(
            &parsed.diagnostics[0],
            Diagnostic::MalformedVoice { reason, .. } if reason.contains("fast")
        ));
        assert!(matches!(
            &parsed.diagnostics[1],
            Diagnostic::MalformedVoice { reason, .. } if reason.contains("expected 3")
        ));
    }

    #[test]
    fn bracketed_voice_bounds_are_not_enforced() {
        let parsed = bracketed().parse("[VOICE: 500, 9, 1] Loud.", &library());
        assert_eq!(
            parsed.segments[0],
            Segment::Voice(VoiceParams::new(500.0, 9.0, 1.0))
        );
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn bracketed_stage_direction_is_unknown_tag() {
        let parsed = bracketed().parse("Sure [laughs] why not.", &library());
        assert_eq!(
            parsed.segments,
            vec![Segment::text("Sure"), Segment::text("why not.")]
        );
        assert!(matches!(parsed.diagnostics[0], Diagnostic::UnknownTag { .. }));
    }

    #[test]
    fn bracketed_literal_policy_speaks_unknown_tag() {
        let grammar = BracketedGrammar::new(UnknownDirectivePolicy::SpeakLiteral).unwrap();
        let parsed = grammar.parse("Hello [GESTURE: flibber] there", &library());
        assert_eq!(
            parsed.segments,
            vec![Segment::text("Hello [GESTURE: flibber] there")]
        );
        assert_eq!(parsed.diagnostics.len(), 1);
    }

    #[test]
    fn bracketed_plain_text_is_single_segment() {
        let parsed = bracketed().parse("  Just words.  ", &library());
        assert_eq!(parsed.segments, vec![Segment::text("Just words.")]);
    }

    #[test]
    fn bracketed_adjacent_directives_produce_no_empty_text() {
        let parsed = bracketed().parse("[GESTURE: nod][GESTURE: dance]", &library());
        assert_eq!(
            parsed.segments,
            vec![Segment::gesture("nod"), Segment::gesture("dance")]
        );
    }

    #[test]
    fn bracketed_description_lists_gestures() {
        let help = bracketed().describe(&library());
        assert!(help.contains("[GESTURE: name]"));
        assert!(help.contains("dance, nod"));
        assert!(help.contains("pitch 70-100"));
    }

    #[test]
    fn bracketed_unclosed_voice_tag_is_dropped_not_spoken() {
        let parsed = bracketed().parse("Hello [GESTURE: nod] there [VOICE: 90, 2.", &library());
        assert_eq!(
            parsed.segments,
            vec![
                Segment::text("Hello"),
                Segment::gesture("nod"),
                Segment::text("there"),
            ]
        );
        assert!(matches!(
            &parsed.diagnostics[..],
            [Diagnostic::MalformedVoice { raw, .. }] if raw == "[VOICE: 90, 2."
        ));
    }

    #[test]
    fn bracketed_unclosed_other_tag_is_unknown() {
        let parsed = bracketed().parse("Fine. [laughs", &library());
        assert_eq!(parsed.segments, vec![Segment::text("Fine.")]);
        assert!(matches!(&parsed.diagnostics[..], [Diagnostic::UnknownTag { .. }]));
    }

    // ── Delimited ─────────────────────────────────────────────────────────

    #[test]
    fn delimited_registered_marker_is_gesture() {
        let parsed = delimited().parse("Let's party @@dance@@ right now!", &library());
        assert_eq!(
            parsed.segments,
            vec![
                Segment::text("Let's party"),
                Segment::gesture("dance"),
                Segment::text("right now!"),
            ]
        );
    }

    #[test]
    fn delimited_unknown_marker_is_spoken_literally() {
        let parsed = delimited().parse("Hi @@flibber@@ there", &library());
        assert_eq!(parsed.segments, vec![Segment::text("Hi @@flibber@@ there")]);
        assert_eq!(
            parsed.diagnostics,
            vec![Diagnostic::UnknownGesture {
                name: "flibber".to_string()
            }]
        );
    }

    #[test]
    fn delimited_drop_policy_removes_unknown_marker() {
        let grammar = DelimitedGrammar::new(UnknownDirectivePolicy::Drop).unwrap();
        let parsed = grammar.parse("Hi @@flibber@@ there", &library());
        assert_eq!(
            parsed.segments,
            vec![Segment::text("Hi"), Segment::text("there")]
        );
    }

    #[test]
    fn delimited_uppercase_marker_is_not_a_directive() {
        let parsed = delimited().parse("Hi @@Nod@@ there", &library());
        assert_eq!(parsed.segments, vec![Segment::text("Hi @@Nod@@ there")]);
        assert!(parsed.diagnostics.is_empty());
    }

    #[test]
    fn delimited_ignores_brackets() {
        let parsed = delimited().parse("[GESTURE: nod] ok @@nod@@", &library());
        assert_eq!(
            parsed.segments,
            vec![Segment::text("[GESTURE: nod] ok"), Segment::gesture("nod")]
        );
    }

    // ── Kind / helpers ────────────────────────────────────────────────────

    #[test]
    fn grammar_kind_default_policies() {
        assert_eq!(
            GrammarKind::Bracketed.default_policy(),
            UnknownDirectivePolicy::Drop
        );
        assert_eq!(
            GrammarKind::Delimited.default_policy(),
            UnknownDirectivePolicy::SpeakLiteral
        );
    }

    #[test]
    fn grammar_kind_builds_named_grammar() {
        assert_eq!(GrammarKind::Bracketed.build(None).unwrap().name(), "bracketed");
        assert_eq!(GrammarKind::Delimited.build(None).unwrap().name(), "delimited");
    }

    #[test]
    fn spoken_text_joins_text_segments() {
        let parsed = bracketed().parse("One [GESTURE: nod] two.", &library());
        assert_eq!(parsed.spoken_text(), "One two.");
    }
}
