//! Rolling conversation context.

/// One completed input → response pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Exchange {
    pub input: String,
    pub response: String,
}

/// Every exchange of the running session, oldest first.
///
/// The list only grows; [`recent`][Self::recent] and
/// [`render`][Self::render] cap what is shown to the model.
#[derive(Debug, Clone)]
pub struct ConversationContext {
    user_label: String,
    robot_label: String,
    exchanges: Vec<Exchange>,
}

impl Default for ConversationContext {
    fn default() -> Self {
        Self::with_labels("Patient", "Therapist")
    }
}

impl ConversationContext {
    /// Empty context whose rendered lines name the speakers `user_label` and
    /// `robot_label`.
    pub fn with_labels(user_label: impl Into<String>, robot_label: impl Into<String>) -> Self {
        Self {
            user_label: user_label.into(),
            robot_label: robot_label.into(),
            exchanges: Vec::new(),
        }
    }

    pub fn push(&mut self, input: impl Into<String>, response: impl Into<String>) {
        self.exchanges.push(Exchange {
            input: input.into(),
            response: response.into(),
        });
    }

    /// The last `k` exchanges (fewer if the session is younger).
    pub fn recent(&self, k: usize) -> &[Exchange] {
        let start = self.exchanges.len().saturating_sub(k);
        &self.exchanges[start..]
    }

    /// The last `k` exchanges as prompt lines, or an empty string when there
    /// is no history yet.
    ///
    /// ```
    /// use teddy_memory::ConversationContext;
    ///
    /// let mut ctx = ConversationContext::default();
    /// ctx.push("I feel tired", "Have you tried sleeping?");
    /// assert_eq!(
    ///     ctx.render(5),
    ///     "Previous exchange: Patient: I feel tired | Therapist: Have you tried sleeping?"
    /// );
    /// ```
    pub fn render(&self, k: usize) -> String {
        self.recent(k)
            .iter()
            .map(|e| {
                format!(
                    "Previous exchange: {}: {} | {}: {}",
                    self.user_label, e.input, self.robot_label, e.response
                )
            })
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn len(&self) -> usize {
        self.exchanges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.exchanges.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_context_renders_nothing() {
        let ctx = ConversationContext::default();
        assert!(ctx.is_empty());
        assert_eq!(ctx.render(5), "");
    }

    #[test]
    fn recent_caps_to_last_k() {
        let mut ctx = ConversationContext::default();
        for i in 0..8 {
            ctx.push(format!("in{i}"), format!("out{i}"));
        }
        let recent = ctx.recent(5);
        assert_eq!(recent.len(), 5);
        assert_eq!(recent[0].input, "in3");
        assert_eq!(recent[4].input, "in7");
        // The full history is retained.
        assert_eq!(ctx.len(), 8);
    }

    #[test]
    fn recent_with_k_larger_than_history() {
        let mut ctx = ConversationContext::default();
        ctx.push("a", "b");
        assert_eq!(ctx.recent(10).len(), 1);
    }

    #[test]
    fn render_uses_custom_labels_in_order() {
        let mut ctx = ConversationContext::with_labels("User", "Robot");
        ctx.push("hi", "hello.");
        ctx.push("bye", "see you.");
        assert_eq!(
            ctx.render(5),
            "Previous exchange: User: hi | Robot: hello.\nPrevious exchange: User: bye | Robot: see you."
        );
    }

    #[test]
    fn zero_window_renders_nothing() {
        let mut ctx = ConversationContext::default();
        ctx.push("a", "b");
        assert_eq!(ctx.render(0), "");
    }
}
