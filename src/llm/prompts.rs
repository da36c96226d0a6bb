// ABOUTME: System prompt assembly from resolved chatbot configuration
// ABOUTME: Combines base instructions, personality, and tenant custom instructions
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Ghosty Labs

use crate::agent::ResolvedConfig;

/// Guardrail appended to every system prompt
///
/// Tool results are the only source of truth for actions: the model must not
/// claim an email was sent or a lead was saved unless the tool said so.
const ACTION_GUARDRAIL: &str = "Only state that an action (email, booking, payment link, saved \
contact) was completed when the corresponding tool reported success. If a tool fails, tell the \
user plainly and suggest what to try next.";

/// Build the full system prompt for one turn
#[must_use]
pub fn build_system_prompt(config: &ResolvedConfig) -> String {
    let mut prompt = String::with_capacity(
        config.instructions.len() + config.custom_instructions.len() + 256,
    );
    prompt.push_str(&config.instructions);

    if !config.personality.is_empty() {
        prompt.push_str("\n\nTone: respond in a ");
        prompt.push_str(&config.personality);
        prompt.push_str(" manner.");
    }

    if !config.custom_instructions.is_empty() {
        prompt.push_str("\n\nAdditional instructions from the chatbot owner:\n");
        prompt.push_str(&config.custom_instructions);
    }

    if !config.context_items.is_empty() {
        prompt.push_str("\n\nKnowledge base excerpts (ordered by priority):\n");
        for item in &config.context_items {
            prompt.push_str("\n## ");
            prompt.push_str(&item.title);
            prompt.push('\n');
            prompt.push_str(&item.content);
            prompt.push('\n');
        }
    }

    prompt.push_str("\n\n");
    prompt.push_str(ACTION_GUARDRAIL);
    prompt
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::resolver::resolve;
    use crate::models::ChatbotDefinition;

    #[test]
    fn test_prompt_contains_guardrail_and_personality() {
        let chatbot = ChatbotDefinition::platform_assistant();
        let config = resolve(&chatbot, "pro");
        let prompt = build_system_prompt(&config);
        assert!(prompt.contains("Tone: respond in a helpful manner."));
        assert!(prompt.contains("reported success"));
    }
}
