use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, types::Uuid, PgPool, Postgres, Row};

use loremaster_common::get_current_timestamp;

#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageRole {
    #[default]
    User,
    Ai,
}

impl MessageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageRole::User => "user",
            MessageRole::Ai => "ai",
        }
    }

    /// The label used for this role in a flat transcript.
    pub fn speaker(&self) -> &'static str {
        match self {
            MessageRole::User => "Player",
            MessageRole::Ai => "DM",
        }
    }
}

impl std::str::FromStr for MessageRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "user" => Ok(MessageRole::User),
            "ai" => Ok(MessageRole::Ai),
            other => Err(anyhow!("unknown message role: {}", other)),
        }
    }
}

/// One entry of the structured transcript carried on the wire.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ChatTurn {
    pub role: MessageRole,
    pub content: String,
}

/// A persisted transcript entry, two per chat turn. Insert-only.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CampaignMessage {
    pub id: Uuid,
    pub campaign_id: String,
    pub role: MessageRole,
    pub content: String,
    pub created_at: i64,
}

impl CampaignMessage {
    pub fn new(campaign_id: &str, role: MessageRole, content: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id: campaign_id.to_string(),
            role,
            content: content.to_string(),
            created_at: get_current_timestamp(),
        }
    }

    pub async fn save<'e, Exe>(&self, executor: Exe) -> Result<()>
    where
        Exe: sqlx::Executor<'e, Database = Postgres> + Send,
    {
        sqlx::query(r#"
            INSERT INTO campaign_messages (id, campaign_id, role, content, created_at)
            VALUES ($1, $2, $3, $4, $5)
        "#)
        .bind(self.id)
        .bind(&self.campaign_id)
        .bind(self.role.as_str())
        .bind(&self.content)
        .bind(self.created_at)
        .execute(executor)
        .await?;

        Ok(())
    }

    /// The full transcript of a campaign in creation order. Ties on the
    /// second-granular timestamp fall back to insertion order.
    pub async fn find_by_campaign(pool: &PgPool, campaign_id: &str) -> Result<Vec<Self>> {
        let rows = sqlx::query(r#"
            SELECT id, campaign_id, role, content, created_at
            FROM campaign_messages
            WHERE campaign_id = $1
            ORDER BY created_at ASC, seq ASC
        "#)
        .bind(campaign_id)
        .fetch_all(pool)
        .await?;

        rows.iter().map(Self::from_row).collect()
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        let role: String = row.try_get("role")?;
        Ok(Self {
            id: row.try_get("id")?,
            campaign_id: row.try_get("campaign_id")?,
            role: role.parse()?,
            content: row.try_get("content")?,
            created_at: row.try_get("created_at")?,
        })
    }
}
