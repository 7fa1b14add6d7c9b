use std::env;

use anyhow::{anyhow, Result};
use loremaster_common::{define_module_client, ModuleClient};

use async_openai::{
    config::OpenAIConfig,
    types::CreateEmbeddingRequestArgs,
    Client
};

use crate::{Embedding, EMBEDDING_MODEL};

define_module_client! {
    (struct EmbederClient, "embeder")
    client_type: Client<OpenAIConfig>,
    env: ["EMBEDDING_BASE_URL", "EMBEDDING_API_KEY"],
    setup: async {
        let base_url = env::var("EMBEDDING_BASE_URL").expect("EMBEDDING_BASE_URL is not set");
        let api_key = env::var("EMBEDDING_API_KEY").expect("EMBEDDING_API_KEY is not set");
        let embeder_config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(api_key);

        Client::build(
            reqwest::Client::new(),
            embeder_config,
            Default::default()
        )
    }
}

impl EmbederClient {
    pub async fn embed(&self, text: Vec<String>) -> Result<Vec<Embedding>> {
        if text.is_empty() {
            return Ok(vec![]);
        }
        tracing::debug!("[EmbederClient::embed] Embedding {} inputs", text.len());

        let request = CreateEmbeddingRequestArgs::default()
            .model(EMBEDDING_MODEL)
            .input(text)
            .build()?;

        let response = self.get_client().embeddings().create(request).await?;
        let embeddings = response.data
            .into_iter()
            .map(|item| item.embedding)
            .collect::<Vec<_>>();

        Ok(embeddings)
    }

    /// Embeds a single query string.
    pub async fn embed_one(&self, text: &str) -> Result<Embedding> {
        let mut embeddings = self.embed(vec![text.to_string()]).await?;
        if embeddings.is_empty() {
            return Err(anyhow!("[EmbederClient::embed_one] Embedding service returned no vector"));
        }
        Ok(embeddings.remove(0))
    }
}
