use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};

use loremaster_clients::{EmbederClient, LlmClient, PostgresClient};

use crate::{
    merge_context, CampaignContext, CampaignMessage, CharacterSheet, ChatTurn,
    MessageRole, PromptTemplate, RuleStore, RULE_MATCH_COUNT,
};

/// The result of one turn: the generated reply plus the flat transcript with
/// this turn appended.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct DmTurn {
    pub response: String,
    pub history: String,
}

/// Orchestrates a chat turn: load context, retrieve rules, build the prompt,
/// call the model, persist the transcript. Only the model call is mandatory;
/// every other step degrades with a warning.
#[derive(Clone)]
pub struct DmEngine {
    llm: LlmClient,
    embeder: EmbederClient,
    db: PostgresClient,
    rules: RuleStore,
    template: PromptTemplate,
}

impl DmEngine {
    pub fn new(
        llm: LlmClient,
        embeder: EmbederClient,
        db: PostgresClient,
        template: PromptTemplate,
    ) -> Self {
        let rules = RuleStore::new(db.clone());
        Self { llm, embeder, db, rules, template }
    }

    pub fn rule_store(&self) -> &RuleStore {
        &self.rules
    }

    /// Raw passthrough: no persistence, no retrieval augmentation.
    pub async fn respond(&self, input: &str, history: &str) -> Result<DmTurn> {
        let prompt = self.template.render(history, input, "");
        let response = self.llm.complete(&prompt).await?;

        Ok(DmTurn {
            history: append_turn(history, input, &response),
            response,
        })
    }

    /// Builds and stores the campaign context, replacing any prior row for
    /// this campaign, and returns it with the full message history. A write
    /// that leaves no readable row behind is fatal here: later turns depend
    /// on this state existing.
    pub async fn init_session(
        &self,
        campaign_id: &str,
        player_name: &str,
        character: Option<CharacterSheet>,
    ) -> Result<(CampaignContext, Vec<CampaignMessage>)> {
        let mut context_text = format!(
            "You are the Dungeon Master of campaign \"{campaign_id}\". \
             The player at the table is {player_name}."
        );
        if let Some(character) = &character {
            context_text.push_str("\n\n");
            context_text.push_str(&character.describe());
        }

        let context = CampaignContext::new(campaign_id, context_text, character, player_name);
        context.upsert(self.db.pool()).await?;

        let stored = CampaignContext::find_by_campaign(self.db.pool(), campaign_id)
            .await?
            .ok_or(anyhow!(
                "[DmEngine::init_session] Context for campaign {} was not stored", campaign_id
            ))?;

        let history = CampaignMessage::find_by_campaign(self.db.pool(), campaign_id).await?;

        Ok((stored, history))
    }

    /// A context-augmented turn. Context and rules degrade to empty on any
    /// fault; the completion call does not. Both sides of the turn are
    /// persisted best-effort after the response is computed.
    pub async fn chat(
        &self,
        message: &str,
        history: &[ChatTurn],
        campaign_id: &str,
        player_name: &str,
    ) -> Result<DmTurn> {
        tracing::debug!(
            "[DmEngine::chat] campaign={} player={} history_len={}",
            campaign_id, player_name, history.len()
        );

        let context = self.load_context(campaign_id).await;
        let (context_text, character) = match &context {
            Some(context) => (context.context_text.as_str(), context.character.as_ref()),
            None => ("", None),
        };

        let rules = self.retrieve_rules(message, RULE_MATCH_COUNT).await;
        let merged = merge_context(context_text, character, &rules);

        let flat_history = flatten_history(history);
        let prompt = self.template.render(&flat_history, message, &merged);

        let response = self.llm.complete(&prompt).await?;

        self.persist_turn(campaign_id, message, &response).await;

        Ok(DmTurn {
            history: append_turn(&flat_history, message, &response),
            response,
        })
    }

    /// Best-effort context load. A missing row and an unreachable store look
    /// the same to the caller: no context.
    async fn load_context(&self, campaign_id: &str) -> Option<CampaignContext> {
        match CampaignContext::find_by_campaign(self.db.pool(), campaign_id).await {
            Ok(context) => context,
            Err(e) => {
                tracing::warn!(
                    "[DmEngine::load_context] Failed to load context for campaign {}: {}",
                    campaign_id, e
                );
                None
            }
        }
    }

    /// Best-effort rule retrieval; embedding or search faults degrade to an
    /// empty result set.
    async fn retrieve_rules(&self, query: &str, limit: usize) -> Vec<String> {
        let result: Result<Vec<String>> = async {
            let query_embedding = self.embeder.embed_one(query).await?;
            self.rules.search(&query_embedding, limit).await
        }.await;

        match result {
            Ok(rules) => rules,
            Err(e) => {
                tracing::warn!("[DmEngine::retrieve_rules] Degrading to no rules: {}", e);
                Vec::new()
            }
        }
    }

    /// Persists the player message and the generated reply, in that order,
    /// with non-decreasing timestamps. Failure is logged and the response
    /// already computed is returned unchanged.
    async fn persist_turn(&self, campaign_id: &str, input: &str, response: &str) {
        let user_message = CampaignMessage::new(campaign_id, MessageRole::User, input);
        let mut ai_message = CampaignMessage::new(campaign_id, MessageRole::Ai, response);
        if ai_message.created_at < user_message.created_at {
            ai_message.created_at = user_message.created_at;
        }

        let result: Result<()> = async {
            let mut tx = self.db.pool().begin().await?;
            user_message.save(&mut *tx).await?;
            ai_message.save(&mut *tx).await?;
            tx.commit().await?;
            Ok(())
        }.await;

        if let Err(e) = result {
            tracing::warn!(
                "[DmEngine::persist_turn] Dropping turn for campaign {}: {}",
                campaign_id, e
            );
        }
    }
}

/// `history + "\nPlayer: " + input + "\nDM: " + response`, exactly.
pub fn append_turn(history: &str, input: &str, response: &str) -> String {
    format!("{history}\nPlayer: {input}\nDM: {response}")
}

/// Flattens the structured transcript into the line format used in prompts.
pub fn flatten_history(history: &[ChatTurn]) -> String {
    history.iter()
        .map(|turn| format!("{}: {}", turn.role.speaker(), turn.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use loremaster_common::ModuleClient;

    #[test]
    fn append_turn_is_exact() {
        assert_eq!(
            append_turn("old", "I cast fireball", "It explodes."),
            "old\nPlayer: I cast fireball\nDM: It explodes."
        );
        assert_eq!(
            append_turn("", "hello", "well met"),
            "\nPlayer: hello\nDM: well met"
        );
    }

    #[test]
    fn flatten_history_labels_roles() {
        let history = vec![
            ChatTurn { role: MessageRole::User, content: "I open the door".into() },
            ChatTurn { role: MessageRole::Ai, content: "It creaks open".into() },
        ];
        assert_eq!(flatten_history(&history), "Player: I open the door\nDM: It creaks open");
        assert_eq!(flatten_history(&[]), "");
    }

    // integration test, runs only against a live database; the llm and
    // embeder clients stay unconnected since init never touches them
    #[tokio::test]
    async fn init_twice_leaves_one_row_with_second_payload() -> Result<()> {
        if std::env::var("DATABASE_URL").is_err() {
            println!("Skipping database test - no DATABASE_URL set");
            return Ok(());
        }

        let db = PostgresClient::setup_connection().await;
        db.init_schema().await?;
        let engine = DmEngine::new(
            LlmClient::default(),
            EmbederClient::default(),
            db.clone(),
            PromptTemplate::default(),
        );

        let campaign_id = format!("test-campaign-{}", uuid::Uuid::new_v4());

        let first_sheet: CharacterSheet =
            serde_json::from_str(r#"{"name": "Zaria", "race": "Elf", "class": "Wizard"}"#)?;
        let (first, history) = engine
            .init_session(&campaign_id, "Alice", Some(first_sheet))
            .await?;

        assert!(history.is_empty());
        for expected in ["Alice", "Zaria", "Elf", "Wizard"] {
            assert!(first.context_text.contains(expected), "missing {expected}");
        }

        let second_sheet: CharacterSheet =
            serde_json::from_str(r#"{"name": "Borin", "race": "Dwarf"}"#)?;
        let (second, _) = engine
            .init_session(&campaign_id, "Alice", Some(second_sheet))
            .await?;

        assert!(second.context_text.contains("Borin"));
        assert!(!second.context_text.contains("Zaria"));

        let row = sqlx::query("SELECT COUNT(*) as count FROM campaign_contexts WHERE campaign_id = $1")
            .bind(&campaign_id)
            .fetch_one(db.pool())
            .await?;
        let count: i64 = sqlx::Row::try_get(&row, "count")?;
        assert_eq!(count, 1);

        Ok(())
    }

    const CHAT_COMPLETION_STUB: &str = r#"{"id":"chatcmpl-test","object":"chat.completion","created":0,"model":"gpt-4","choices":[{"index":0,"message":{"role":"assistant","content":"The fireball engulfs the goblin camp."},"finish_reason":"stop","logprobs":null}],"usage":{"prompt_tokens":1,"completion_tokens":1,"total_tokens":1}}"#;

    const SERVER_ERROR_STUB: &str = r#"{"error":{"message":"inference backend unavailable","type":"server_error"}}"#;

    /// Serves every request on a local port with one canned response.
    async fn spawn_stub(status: u16, body: &'static str) -> String {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            while let Ok((mut socket, _)) = listener.accept().await {
                tokio::spawn(async move {
                    let mut buf = Vec::new();
                    let mut chunk = [0u8; 4096];
                    let mut header_end = None;
                    let mut content_length = 0usize;

                    // drain the request before answering
                    loop {
                        match socket.read(&mut chunk).await {
                            Ok(0) | Err(_) => break,
                            Ok(n) => buf.extend_from_slice(&chunk[..n]),
                        }
                        if header_end.is_none() {
                            if let Some(pos) = buf.windows(4).position(|w| w == b"\r\n\r\n") {
                                header_end = Some(pos + 4);
                                let headers = String::from_utf8_lossy(&buf[..pos]);
                                content_length = headers.lines()
                                    .find_map(|line| {
                                        let (name, value) = line.split_once(':')?;
                                        if name.eq_ignore_ascii_case("content-length") {
                                            value.trim().parse::<usize>().ok()
                                        } else {
                                            None
                                        }
                                    })
                                    .unwrap_or(0);
                            }
                        }
                        if let Some(end) = header_end {
                            if buf.len() >= end + content_length {
                                break;
                            }
                        }
                    }

                    let reason = if status == 200 { "OK" } else { "Internal Server Error" };
                    let response = format!(
                        "HTTP/1.1 {status} {reason}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                        body.len()
                    );
                    let _ = socket.write_all(response.as_bytes()).await;
                    let _ = socket.shutdown().await;
                });
            }
        });

        format!("http://{}", addr)
    }

    // integration test; the completion and embedding endpoints are local
    // stubs, only the database is real
    #[tokio::test]
    async fn only_completion_faults_surface_from_a_turn() -> Result<()> {
        if std::env::var("DATABASE_URL").is_err() {
            println!("Skipping database test - no DATABASE_URL set");
            return Ok(());
        }

        let completion_stub = spawn_stub(200, CHAT_COMPLETION_STUB).await;
        let failing_stub = spawn_stub(500, SERVER_ERROR_STUB).await;

        std::env::set_var("OPENAI_API_KEY", "test-key");
        std::env::set_var("EMBEDDING_API_KEY", "test-key");
        std::env::set_var("OPENAI_BASE_URL", &completion_stub);
        // the embeder always faults, so rule retrieval must degrade
        std::env::set_var("EMBEDDING_BASE_URL", &failing_stub);

        let llm = LlmClient::setup_connection().await;
        let embeder = EmbederClient::setup_connection().await;
        let db = PostgresClient::setup_connection().await;
        db.init_schema().await?;

        let engine = DmEngine::new(llm, embeder.clone(), db.clone(), PromptTemplate::default());

        let campaign_id = format!("test-campaign-{}", uuid::Uuid::new_v4());
        let sheet: CharacterSheet =
            serde_json::from_str(r#"{"name": "Zaria", "race": "Elf", "class": "Wizard"}"#)?;
        engine.init_session(&campaign_id, "Alice", Some(sheet)).await?;

        // retrieval degrades to empty, the turn still completes
        let turn = engine.chat("I cast fireball", &[], &campaign_id, "Alice").await?;
        assert_eq!(turn.response, "The fireball engulfs the goblin camp.");
        assert_eq!(
            turn.history,
            "\nPlayer: I cast fireball\nDM: The fireball engulfs the goblin camp."
        );

        // both sides of the turn are persisted, user first, timestamps non-decreasing
        let messages = CampaignMessage::find_by_campaign(db.pool(), &campaign_id).await?;
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].role, MessageRole::User);
        assert_eq!(messages[0].content, "I cast fireball");
        assert_eq!(messages[1].role, MessageRole::Ai);
        assert_eq!(messages[1].content, turn.response);
        assert!(messages[0].created_at <= messages[1].created_at);

        // raw passthrough appends exactly one turn to the caller's transcript
        let raw = engine.respond("Hello there", "prior").await?;
        assert_eq!(
            raw.history,
            format!("prior\nPlayer: Hello there\nDM: {}", raw.response)
        );

        // a failing completion endpoint is fatal for chat and respond
        std::env::set_var("OPENAI_BASE_URL", &failing_stub);
        let failing_llm = LlmClient::setup_connection().await;
        let failing = DmEngine::new(failing_llm, embeder, db, PromptTemplate::default());

        assert!(failing.respond("hi", "").await.is_err());
        assert!(failing.chat("hi", &[], &campaign_id, "Alice").await.is_err());

        // but init never touches the completion service
        let (context, _) = failing.init_session(&campaign_id, "Alice", None).await?;
        assert!(context.context_text.contains("Alice"));

        Ok(())
    }
}
