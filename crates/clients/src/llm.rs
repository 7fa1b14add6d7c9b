use std::env;

use anyhow::{anyhow, Result};
use loremaster_common::{define_module_client, ModuleClient};

use async_openai::{
    config::OpenAIConfig,
    types::{ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequestArgs},
    Client
};

use crate::{COMPLETION_MAX_TOKENS, COMPLETION_MODEL, COMPLETION_TEMPERATURE};

define_module_client! {
    (struct LlmClient, "llm")
    client_type: Client<OpenAIConfig>,
    env: ["OPENAI_BASE_URL", "OPENAI_API_KEY"],
    setup: async {
        let base_url = env::var("OPENAI_BASE_URL").expect("OPENAI_BASE_URL is not set");
        let api_key = env::var("OPENAI_API_KEY").expect("OPENAI_API_KEY is not set");
        let openai_config = OpenAIConfig::new()
            .with_api_base(base_url)
            .with_api_key(api_key);

        Client::build(
            reqwest::Client::new(),
            openai_config,
            Default::default()
        )
    }
}

impl LlmClient {
    /// Sends a single-shot completion request and returns the generated text.
    pub async fn complete(&self, prompt: &str) -> Result<String> {
        tracing::debug!("[LlmClient::complete] Prompt length: {}", prompt.len());

        let message = ChatCompletionRequestUserMessageArgs::default()
            .content(prompt.to_string())
            .build()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(COMPLETION_MODEL)
            .messages(vec![message.into()])
            .temperature(COMPLETION_TEMPERATURE)
            .max_tokens(COMPLETION_MAX_TOKENS)
            .build()?;

        let response = self.get_client().chat().create(request).await?;
        let choice = response.choices.first()
            .ok_or(anyhow!("[LlmClient::complete] No choices returned by model {}", COMPLETION_MODEL))?;

        choice.message.content.clone()
            .ok_or(anyhow!("[LlmClient::complete] No content in the response"))
    }
}
