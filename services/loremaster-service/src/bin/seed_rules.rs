//! Loads an SRD rules text file, embeds it paragraph by paragraph and fills
//! the rule_embeddings table. Run once before serving; /chat degrades to an
//! empty rules section when the corpus is empty.

use anyhow::Result;

use loremaster_clients::{EmbederClient, PostgresClient};
use loremaster_common::ModuleClient;
use loremaster_runtime::{RuleChunk, RuleStore};
use loremaster_service_api::setup_tracing;

const EMBED_BATCH_SIZE: usize = 64;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    setup_tracing();

    let path = std::env::args().nth(1).unwrap_or("data/srd.txt".to_string());
    let text = std::fs::read_to_string(&path)?;

    let chunks = text.split("\n\n")
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(str::to_string)
        .collect::<Vec<_>>();
    tracing::info!("Loaded {} rule chunks from {}", chunks.len(), path);

    let embeder = EmbederClient::setup_connection().await;
    let db = PostgresClient::setup_connection().await;
    db.init_schema().await?;
    let store = RuleStore::new(db);

    for batch in chunks.chunks(EMBED_BATCH_SIZE) {
        let embeddings = embeder.embed(batch.to_vec()).await?;
        let rules = batch.iter()
            .cloned()
            .zip(embeddings)
            .map(|(content, embedding)| RuleChunk { content, embedding })
            .collect::<Vec<_>>();

        let ids = store.add_rules(rules).await?;
        tracing::info!("Inserted {} rule embeddings", ids.len());
    }

    tracing::info!("Rule corpus now holds {} entries", store.count().await?);
    Ok(())
}
