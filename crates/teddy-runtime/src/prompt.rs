//! Prompt assembly.

use teddy_memory::ConversationContext;

/// Opening sentence used when no persona is configured.
pub const DEFAULT_PERSONA: &str =
    "You're a robot therapist that becomes progressively crazier in your responses.";

/// Builds the text sent to the oracle each turn.
///
/// The prompt carries, in order: the persona and the style for the current
/// intensity, the most recent exchanges (omitted on the first turn), the new
/// input, the directive grammar instructions, and the closing instruction.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    persona: String,
    user_label: String,
    robot_label: String,
    context_window: usize,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self::new(
            DEFAULT_PERSONA,
            "Patient",
            "Therapist",
            5,
        )
    }
}

impl PromptBuilder {
    pub fn new(
        persona: impl Into<String>,
        user_label: impl Into<String>,
        robot_label: impl Into<String>,
        context_window: usize,
    ) -> Self {
        Self {
            persona: persona.into(),
            user_label: user_label.into(),
            robot_label: robot_label.into(),
            context_window,
        }
    }

    pub fn build(
        &self,
        style: &str,
        context: &ConversationContext,
        grammar_help: &str,
        input: &str,
    ) -> String {
        let mut prompt = format!(
            "{} Your responses can have a varying level of craziness. \
             In this case, your description is as follows: {style}.\n\n",
            self.persona
        );

        let history = context.render(self.context_window);
        if !history.is_empty() {
            prompt.push_str("Previous conversation:\n");
            prompt.push_str(&history);
            prompt.push_str("\n\n");
        }

        prompt.push_str(&format!("{} just said: '{input}'\n\n", self.user_label));
        prompt.push_str(grammar_help);
        prompt.push_str(&format!(
            "\n\nRespond as the {}. ONLY give your spoken response with the directives above, \
             no other annotations or stage directions.",
            self.robot_label.to_lowercase()
        ));
        prompt
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_turn_prompt_has_no_history_section() {
        let prompt = PromptBuilder::default().build(
            "slightly dismissive",
            &ConversationContext::default(),
            "GRAMMAR",
            "I feel sad",
        );
        assert!(prompt.contains("your description is as follows: slightly dismissive."));
        assert!(!prompt.contains("Previous conversation"));
        assert!(prompt.contains("Patient just said: 'I feel sad'"));
        assert!(prompt.contains("GRAMMAR"));
        assert!(prompt.ends_with("no other annotations or stage directions."));
        assert!(prompt.contains("Respond as the therapist."));
    }

    #[test]
    fn history_is_capped_to_window() {
        let mut ctx = ConversationContext::default();
        for i in 0..4 {
            ctx.push(format!("q{i}"), format!("a{i}."));
        }
        let prompt = PromptBuilder::new("Persona.", "Patient", "Therapist", 2)
            .build("style", &ctx, "", "now");
        assert!(prompt.contains("Previous conversation:"));
        assert!(!prompt.contains("q1"));
        assert!(prompt.contains("Previous exchange: Patient: q2 | Therapist: a2."));
        assert!(prompt.contains("Previous exchange: Patient: q3 | Therapist: a3."));
    }

    #[test]
    fn sections_appear_in_order() {
        let mut ctx = ConversationContext::default();
        ctx.push("before", "reply.");
        let prompt = PromptBuilder::default().build("style", &ctx, "GRAMMAR", "latest");
        let history = prompt.find("Previous conversation").unwrap();
        let input = prompt.find("latest").unwrap();
        let grammar = prompt.find("GRAMMAR").unwrap();
        assert!(history < input && input < grammar);
    }
}
