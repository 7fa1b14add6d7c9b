use std::env;

use anyhow::Result;
use loremaster_common::{define_module_client, ModuleClient};
use sqlx::PgPool;

define_module_client! {
    (struct PostgresClient, "postgres")
    client_type: PgPool,
    env: ["DATABASE_URL"],
    setup: async {
        let database_url = env::var("DATABASE_URL").expect("DATABASE_URL is not set");
        PgPool::connect(&database_url).await
            .expect("Failed to connect to postgres")
    }
}

impl PostgresClient {
    pub fn pool(&self) -> &PgPool {
        self.get_client().as_ref()
    }

    /// Creates the vector extension and all tables used by the service.
    pub async fn init_schema(&self) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        sqlx::query("CREATE EXTENSION IF NOT EXISTS vector")
            .execute(&mut *tx)
            .await?;

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS campaign_contexts (
                campaign_id TEXT PRIMARY KEY,
                context_text TEXT NOT NULL,
                "character" JSONB,
                created_by TEXT NOT NULL,
                updated_at BIGINT NOT NULL
            )
        "#)
        .execute(&mut *tx)
        .await?;

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS campaign_messages (
                id UUID PRIMARY KEY,
                seq BIGSERIAL,
                campaign_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at BIGINT NOT NULL
            )
        "#)
        .execute(&mut *tx)
        .await?;

        sqlx::query(r#"
            CREATE INDEX IF NOT EXISTS campaign_messages_campaign_idx
            ON campaign_messages (campaign_id, created_at)
        "#)
        .execute(&mut *tx)
        .await?;

        sqlx::query(r#"
            CREATE TABLE IF NOT EXISTS rule_embeddings (
                id UUID PRIMARY KEY,
                content TEXT NOT NULL,
                embedding vector,
                created_at BIGINT NOT NULL
            )
        "#)
        .execute(&mut *tx)
        .await?;

        // rule chunks can exceed the btree row limit, so uniqueness is
        // enforced on the content digest rather than the text itself
        sqlx::query(r#"
            CREATE UNIQUE INDEX IF NOT EXISTS rule_embeddings_content_idx
            ON rule_embeddings ((md5(content)))
        "#)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        // hnsw needs a typed vector column, which the table deliberately does
        // not enforce so any embedding dimension can be stored. Index creation
        // is attempted and skipped when the server refuses it.
        let index = sqlx::query(r#"
            CREATE INDEX IF NOT EXISTS rule_embeddings_hnsw_idx
            ON rule_embeddings USING hnsw (embedding vector_cosine_ops)
            WITH (m = 16, ef_construction = 64)
        "#)
        .execute(self.pool())
        .await;

        if let Err(e) = index {
            tracing::warn!("[PostgresClient::init_schema] Skipping hnsw index: {}", e);
        }

        Ok(())
    }
}
