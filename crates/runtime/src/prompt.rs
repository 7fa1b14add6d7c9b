use std::path::Path;

use anyhow::{Context, Result};

use crate::CharacterSheet;

/// Fallback template, used when DM_PROMPT_PATH is not set.
pub const DEFAULT_DM_PROMPT: &str = r#"You are an experienced Dungeon Master running a tabletop role-playing campaign.
Narrate vividly, stay consistent with everything established so far, and always
end your reply at a point where the player can act.

{{context}}

Conversation so far:
{{history}}

Player: {{input}}
DM:"#;

/// A prompt template with named placeholders, loaded once at process start.
/// Rendering is a pure string substitution with no I/O.
#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self { template: DEFAULT_DM_PROMPT.to_string() }
    }
}

impl PromptTemplate {
    pub fn from_template(template: &str) -> Self {
        for placeholder in ["{{history}}", "{{input}}", "{{context}}"] {
            if !template.contains(placeholder) {
                tracing::warn!("[PromptTemplate] Template is missing the {} placeholder", placeholder);
            }
        }
        Self { template: template.to_string() }
    }

    pub fn load(path: &Path) -> Result<Self> {
        let template = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read prompt template at {}", path.display()))?;
        Ok(Self::from_template(&template))
    }

    pub fn render(&self, history: &str, input: &str, context: &str) -> String {
        self.template
            .replace("{{history}}", history)
            .replace("{{input}}", input)
            .replace("{{context}}", context.trim())
    }
}

/// Merges stored campaign text, the character sheet and retrieved rule
/// snippets into one context string. Pure; inputs are never mutated.
pub fn merge_context(
    context_text: &str,
    character: Option<&CharacterSheet>,
    rules: &[String],
) -> String {
    let mut merged = context_text.trim().to_string();

    if let Some(character) = character {
        if !merged.is_empty() {
            merged.push_str("\n\n");
        }
        merged.push_str(&character.describe());
    }

    if !rules.is_empty() {
        if !merged.is_empty() {
            merged.push_str("\n\n");
        }
        merged.push_str("Relevant rules:");
        for rule in rules {
            merged.push_str("\n- ");
            merged.push_str(rule);
        }
    }

    merged
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn render_substitutes_all_placeholders() {
        let template = PromptTemplate::from_template(
            "CTX: {{context}} | H: {{history}} | IN: {{input}}"
        );
        let prompt = template.render("Player: hi\nDM: hello", "I open the door", "a dark cave");
        assert_eq!(prompt, "CTX: a dark cave | H: Player: hi\nDM: hello | IN: I open the door");
    }

    #[test]
    fn render_with_empty_history_and_context() {
        let template = PromptTemplate::default();
        let prompt = template.render("", "I look around", "");
        assert!(prompt.contains("Player: I look around"));
        assert!(!prompt.contains("{{"));
    }

    #[test]
    fn merge_keeps_bare_context_text() {
        assert_eq!(merge_context("The party is in Waterdeep.", None, &[]), "The party is in Waterdeep.");
        assert_eq!(merge_context("", None, &[]), "");
    }

    #[test]
    fn merge_appends_character_block_with_defaults() {
        let sheet: CharacterSheet = serde_json::from_str(r#"{"name": "Zaria"}"#).unwrap();
        let merged = merge_context("Intro.", Some(&sheet), &[]);
        assert!(merged.starts_with("Intro.\n\nCharacter Sheet:"));
        assert!(merged.contains("Name: Zaria"));
        assert!(merged.contains("Race: Unknown"));
    }

    #[test]
    fn merge_appends_labeled_rules_section() {
        let rules = vec!["Fireball deals 8d6.".to_string(), "Attacks of opportunity.".to_string()];
        let merged = merge_context("Intro.", None, &rules);
        assert!(merged.contains("Relevant rules:\n- Fireball deals 8d6.\n- Attacks of opportunity."));
    }

    #[test]
    fn merge_omits_rules_section_when_empty() {
        let merged = merge_context("Intro.", None, &[]);
        assert!(!merged.contains("Relevant rules:"));
    }
}
