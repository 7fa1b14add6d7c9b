use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const UNKNOWN: &str = "Unknown";

/// A player character sheet. Every field is optional; callers get a literal
/// "Unknown" placeholder instead of an error when a field was never supplied.
/// Fields this service does not understand are carried through untouched.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CharacterSheet {
    pub name: Option<String>,
    pub race: Option<String>,
    pub class: Option<String>,
    pub background: Option<String>,

    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CharacterSheet {
    fn field(value: &Option<String>) -> &str {
        value.as_deref().unwrap_or(UNKNOWN)
    }

    pub fn name(&self) -> &str { Self::field(&self.name) }
    pub fn race(&self) -> &str { Self::field(&self.race) }
    pub fn class(&self) -> &str { Self::field(&self.class) }
    pub fn background(&self) -> &str { Self::field(&self.background) }

    /// Renders the sheet as a human-readable block for prompt context.
    pub fn describe(&self) -> String {
        format!(
            "Character Sheet:\nName: {}\nRace: {}\nClass: {}\nBackground: {}",
            self.name(),
            self.race(),
            self.class(),
            self.background(),
        )
    }
}
