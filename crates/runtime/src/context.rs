use anyhow::Result;
use serde::{Deserialize, Serialize};
use sqlx::{postgres::PgRow, types::Json, PgPool, Row};

use loremaster_common::get_current_timestamp;

use crate::CharacterSheet;

/// One row per campaign, keyed by campaign_id. Session init replaces the row
/// wholesale; nothing else writes to it.
#[derive(Debug, Serialize, Deserialize, Clone, Default, PartialEq)]
pub struct CampaignContext {
    pub campaign_id: String,
    pub context_text: String,
    pub character: Option<CharacterSheet>,
    pub created_by: String,
    pub updated_at: i64,
}

impl CampaignContext {
    pub fn new(
        campaign_id: &str,
        context_text: String,
        character: Option<CharacterSheet>,
        created_by: &str,
    ) -> Self {
        Self {
            campaign_id: campaign_id.to_string(),
            context_text,
            character,
            created_by: created_by.to_string(),
            updated_at: get_current_timestamp(),
        }
    }

    /// Create-or-replace keyed by campaign_id.
    pub async fn upsert(&self, pool: &PgPool) -> Result<u64> {
        let result = sqlx::query(r#"
            INSERT INTO campaign_contexts (campaign_id, context_text, "character", created_by, updated_at)
            VALUES ($1, $2, $3, $4, $5)
            ON CONFLICT (campaign_id) DO UPDATE SET
                context_text = EXCLUDED.context_text,
                "character" = EXCLUDED."character",
                created_by = EXCLUDED.created_by,
                updated_at = EXCLUDED.updated_at
        "#)
        .bind(&self.campaign_id)
        .bind(&self.context_text)
        .bind(self.character.as_ref().map(Json))
        .bind(&self.created_by)
        .bind(self.updated_at)
        .execute(pool)
        .await?;

        Ok(result.rows_affected())
    }

    pub async fn find_by_campaign(pool: &PgPool, campaign_id: &str) -> Result<Option<Self>> {
        let row = sqlx::query(r#"
            SELECT campaign_id, context_text, "character", created_by, updated_at
            FROM campaign_contexts
            WHERE campaign_id = $1
        "#)
        .bind(campaign_id)
        .fetch_optional(pool)
        .await?;

        row.as_ref().map(Self::from_row).transpose()
    }

    fn from_row(row: &PgRow) -> Result<Self> {
        let character: Option<Json<CharacterSheet>> = row.try_get("character")?;
        Ok(Self {
            campaign_id: row.try_get("campaign_id")?,
            context_text: row.try_get("context_text")?,
            character: character.map(|json| json.0),
            created_by: row.try_get("created_by")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
