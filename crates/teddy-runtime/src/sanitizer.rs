//! Response sanitizer.
//!
//! Generated text often arrives wrapped in quotation marks (which the speech
//! engine pronounces) and cut off mid-sentence by the generation length
//! limit.  [`sanitize`] removes both, or rejects the text outright when no
//! complete sentence survives.
//!
//! Only sentence-ending punctuation counts: a `.` between two digits
//! (`2.5`) is a decimal point, and anything inside a `[...]` directive tag is
//! ignored, so truncation never cuts a tag in half.

/// Straight and curly quotation characters stripped from both ends.
const QUOTES: &[char] = &['"', '\'', '\u{201C}', '\u{201D}', '\u{2018}', '\u{2019}'];

/// Clean raw model output for speech.
///
/// - Empty or all-whitespace input yields `None`.
/// - Leading and trailing quotes and whitespace are removed.
/// - Text already ending in `.`, `!` or `?`, optionally followed by closed
///   directive tags, is returned as is.
/// - Otherwise the text is cut after its last sentence terminator, provided
///   that terminator is not the very first character.
/// - Text without any terminator yields `None`.
///
/// ```
/// use teddy_runtime::sanitizer::sanitize;
///
/// assert_eq!(sanitize("Great idea! Let's do thi").as_deref(), Some("Great idea!"));
/// assert_eq!(sanitize("\"Wow, that's wild"), None);
/// ```
pub fn sanitize(raw: &str) -> Option<String> {
    let text = strip_quotes(raw);
    if text.is_empty() {
        return None;
    }
    let ends = sentence_ends(text);
    if ends_complete(text, &ends) {
        return Some(text.to_string());
    }
    match ends.last() {
        Some(&idx) if idx > 0 => {
            // Terminators are ASCII, so `idx + 1` is a char boundary.
            let cut = strip_quotes(&text[..=idx]);
            (!cut.is_empty()).then(|| cut.to_string())
        }
        _ => None,
    }
}

/// Byte offsets of sentence terminators outside `[...]` tags, skipping
/// decimal points.
fn sentence_ends(text: &str) -> Vec<usize> {
    let bytes = text.as_bytes();
    let mut depth = 0usize;
    let mut ends = Vec::new();
    for (idx, c) in text.char_indices() {
        match c {
            '[' => depth += 1,
            ']' => depth = depth.saturating_sub(1),
            '.' | '!' | '?' if depth == 0 => {
                let decimal = c == '.'
                    && idx > 0
                    && bytes[idx - 1].is_ascii_digit()
                    && bytes.get(idx + 1).is_some_and(u8::is_ascii_digit);
                if !decimal {
                    ends.push(idx);
                }
            }
            _ => {}
        }
    }
    ends
}

/// Whether only whitespace and closed tags follow the last sentence end.
fn ends_complete(text: &str, ends: &[usize]) -> bool {
    let Some(&last) = ends.last() else {
        return false;
    };
    let mut rest = text[last + 1..].trim_start();
    while let Some(tag) = rest.strip_prefix('[') {
        match tag.find(']') {
            Some(close) if !tag[..close].contains('[') => {
                rest = tag[close + 1..].trim_start();
            }
            _ => return false,
        }
    }
    rest.is_empty()
}

fn strip_quotes(s: &str) -> &str {
    s.trim_matches(|c: char| c.is_whitespace() || QUOTES.contains(&c))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn complete_sentence_is_unchanged() {
        assert_eq!(sanitize("Hello there.").as_deref(), Some("Hello there."));
        assert_eq!(sanitize("Really?").as_deref(), Some("Really?"));
        assert_eq!(sanitize("Stop!").as_deref(), Some("Stop!"));
    }

    #[test]
    fn empty_and_blank_are_rejected() {
        assert_eq!(sanitize(""), None);
        assert_eq!(sanitize("   \n\t "), None);
        assert_eq!(sanitize("\"\""), None);
    }

    #[test]
    fn missing_terminator_is_rejected() {
        assert_eq!(sanitize("\"Wow, that's wild"), None);
        assert_eq!(sanitize("no punctuation at all"), None);
    }

    #[test]
    fn trailing_fragment_is_truncated() {
        assert_eq!(
            sanitize("Great idea! Let's do thi").as_deref(),
            Some("Great idea!")
        );
        assert_eq!(
            sanitize("First. Second? Third, and then").as_deref(),
            Some("First. Second?")
        );
    }

    #[test]
    fn wrapping_quotes_are_stripped() {
        assert_eq!(sanitize("\"Hello there.\"").as_deref(), Some("Hello there."));
        assert_eq!(sanitize("  'Hi.'  ").as_deref(), Some("Hi."));
        assert_eq!(
            sanitize("\u{201C}Curly quotes work too.\u{201D}").as_deref(),
            Some("Curly quotes work too.")
        );
    }

    #[test]
    fn quotes_are_stripped_again_after_truncation() {
        assert_eq!(
            sanitize("\"You should rest.\" And then you").as_deref(),
            Some("You should rest.")
        );
    }

    #[test]
    fn terminator_at_start_only_is_rejected() {
        assert_eq!(sanitize("?what do you"), None);
    }

    #[test]
    fn inner_apostrophes_survive() {
        assert_eq!(
            sanitize("It's fine, isn't it?").as_deref(),
            Some("It's fine, isn't it?")
        );
    }

    #[test]
    fn any_text_ending_in_terminator_round_trips() {
        for s in ["a.", "Yes!", "Why not?", "Two. Sentences."] {
            assert_eq!(sanitize(s).as_deref(), Some(s));
        }
    }

    #[test]
    fn decimal_points_are_not_sentence_ends() {
        assert_eq!(sanitize("It costs 2.50 dollars"), None);
        assert_eq!(
            sanitize("Take 2.5 pills. Then wa").as_deref(),
            Some("Take 2.5 pills.")
        );
    }

    #[test]
    fn truncation_never_cuts_inside_a_tag() {
        assert_eq!(
            sanitize("Hello [GESTURE: nod] there. [VOICE: 90, 2.5, 120] friend and").as_deref(),
            Some("Hello [GESTURE: nod] there.")
        );
        assert_eq!(
            sanitize("Hello there [VOICE: 90, 2.5, 120] friend"),
            None
        );
    }

    #[test]
    fn trailing_closed_tags_keep_the_reply_whole() {
        let reply = "Calm down. [GESTURE: calmdown]";
        assert_eq!(sanitize(reply).as_deref(), Some(reply));
        let reply = "Sure! [VOICE: 90, 2.5, 120] [GESTURE: nod]";
        assert_eq!(sanitize(reply).as_deref(), Some(reply));
    }

    #[test]
    fn trailing_unclosed_tag_is_cut() {
        assert_eq!(
            sanitize("Sure thing. [VOICE: 90, 2.").as_deref(),
            Some("Sure thing.")
        );
    }
}
