use std::collections::HashSet;

use anyhow::Result;
use pgvector::Vector;
use sqlx::{types::Uuid, Row};

use loremaster_clients::{Embedding, PostgresClient};
use loremaster_common::get_current_timestamp;

pub const RULE_MATCH_COUNT: usize = 5;

/// A rule snippet ready for insertion, already embedded.
#[derive(Debug, Clone)]
pub struct RuleChunk {
    pub content: String,
    pub embedding: Embedding,
}

/// Similarity lookup over the rule reference corpus. Ranking happens entirely
/// server-side; results come back in the store's order.
#[derive(Clone)]
pub struct RuleStore {
    db: PostgresClient,
}

impl RuleStore {
    pub fn new(db: PostgresClient) -> Self {
        Self { db }
    }

    pub async fn search(&self, query_embedding: &[f32], limit: usize) -> Result<Vec<String>> {
        let rows = sqlx::query(r#"
            SELECT content
            FROM rule_embeddings
            ORDER BY embedding <=> $1
            LIMIT $2
        "#)
        .bind(Vector::from(query_embedding.to_vec()))
        .bind(limit as i64)
        .fetch_all(self.db.pool())
        .await?;

        rows.iter()
            .map(|row| row.try_get("content").map_err(Into::into))
            .collect()
    }

    /// Inserts embedded rule chunks, skipping content already present in the
    /// corpus so re-running ingestion never doubles it. Returns the ids of
    /// the chunks actually inserted. Used by the ingestion binary, not by
    /// the request path.
    pub async fn add_rules(&self, chunks: Vec<RuleChunk>) -> Result<Vec<Uuid>> {
        if chunks.is_empty() {
            return Ok(vec![]);
        }

        let mut tx = self.db.pool().begin().await?;

        let mut ids = Vec::new();
        let mut seen_contents = HashSet::new();

        for chunk in chunks {
            if !seen_contents.insert(chunk.content.clone()) {
                continue;
            }

            let id = Uuid::new_v4();
            let result = sqlx::query(r#"
                INSERT INTO rule_embeddings (id, content, embedding, created_at)
                VALUES ($1, $2, $3, $4)
                ON CONFLICT ((md5(content))) DO NOTHING
            "#)
            .bind(id)
            .bind(&chunk.content)
            .bind(Vector::from(chunk.embedding))
            .bind(get_current_timestamp())
            .execute(&mut *tx)
            .await?;

            if result.rows_affected() == 1 {
                ids.push(id);
            }
        }

        tx.commit().await?;
        Ok(ids)
    }

    /// Clears the corpus. Ingestion uses it for full reloads, tests for isolation.
    pub async fn reset(&self) -> Result<()> {
        sqlx::query("DELETE FROM rule_embeddings")
            .execute(self.db.pool())
            .await?;
        Ok(())
    }

    pub async fn count(&self) -> Result<u64> {
        let row = sqlx::query("SELECT COUNT(*) as count FROM rule_embeddings")
            .fetch_one(self.db.pool())
            .await?;

        let count: i64 = row.try_get("count")?;
        Ok(count as u64)
    }
}
