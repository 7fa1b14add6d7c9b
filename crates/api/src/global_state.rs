use std::path::Path;

use anyhow::Result;

use loremaster_clients::{EmbederClient, LlmClient, PostgresClient};
use loremaster_common::{EnvVars, ModuleClient};
use loremaster_runtime::{DmEngine, PromptTemplate};

use crate::ApiServerEnv;

/// Process-lifetime state: collaborator handles and the prompt template,
/// built once at startup and read-only afterwards.
#[derive(Clone)]
pub struct GlobalState {
    pub engine: DmEngine,
}

impl GlobalState {
    pub async fn new() -> Result<Self> {
        let env = ApiServerEnv::load();

        let llm = LlmClient::setup_connection().await;
        let embeder = EmbederClient::setup_connection().await;
        let db = PostgresClient::setup_connection().await;
        db.init_schema().await?;

        let template = match &env.dm_prompt_path {
            Some(path) => PromptTemplate::load(Path::new(path))?,
            None => PromptTemplate::default(),
        };

        let engine = DmEngine::new(llm, embeder, db, template);

        Ok(Self { engine })
    }
}
