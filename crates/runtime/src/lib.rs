mod character;
mod context;
mod engine;
mod message;
mod prompt;
mod retriever;

pub use character::CharacterSheet;
pub use context::CampaignContext;
pub use engine::{DmEngine, DmTurn};
pub use message::{CampaignMessage, ChatTurn, MessageRole};
pub use prompt::{merge_context, PromptTemplate, DEFAULT_DM_PROMPT};
pub use retriever::{RuleChunk, RuleStore, RULE_MATCH_COUNT};
