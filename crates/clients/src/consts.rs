pub type Embedding = Vec<f32>;

pub const EMBEDDING_MODEL: &str = "text-embedding-ada-002";

pub const COMPLETION_MODEL: &str = "gpt-4";
pub const COMPLETION_TEMPERATURE: f32 = 0.7;
pub const COMPLETION_MAX_TOKENS: u32 = 1024;
