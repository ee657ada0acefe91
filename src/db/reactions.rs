//! Reaction database repository
//!
//! Reactions are the explorer's own data: an address reacting to any node
//! (usually a proposal), keyed by the target's global identifier.

use anyhow::Result;
use chrono::NaiveDateTime;
use sqlx::PgPool;

/// Reaction record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Reaction {
    pub id: String,
    /// Wire form of the target's global identifier
    pub target: String,
    pub address: String,
    pub reaction: String,
    pub created_at: NaiveDateTime,
}

pub struct ReactionRepository {
    pool: PgPool,
}

impl ReactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get reactions by id, in no particular order
    pub async fn get_by_ids(&self, ids: &[String]) -> Result<Vec<Reaction>> {
        let records = sqlx::query_as::<_, Reaction>(
            r#"
            SELECT id::TEXT AS id, target, address, reaction, created_at
            FROM reaction
            WHERE id::TEXT = ANY($1)
            "#,
        )
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// All reactions on any of `targets`, oldest first
    pub async fn list_by_targets(&self, targets: &[String]) -> Result<Vec<Reaction>> {
        let records = sqlx::query_as::<_, Reaction>(
            r#"
            SELECT id::TEXT AS id, target, address, reaction, created_at
            FROM reaction
            WHERE target = ANY($1)
            ORDER BY created_at, id
            "#,
        )
        .bind(targets)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}
