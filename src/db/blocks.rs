//! Block database repository

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use sqlx::PgPool;

use crate::graphql::pagination::{RangedFetch, Window};

/// Block record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Block {
    pub height: i64,
    pub hash: String,
    pub num_txs: Option<i32>,
    pub total_gas: Option<i64>,
    pub proposer_address: Option<String>,
    pub timestamp: NaiveDateTime,
}

pub struct BlockRepository {
    pool: PgPool,
}

impl BlockRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get blocks by hash, in no particular order
    pub async fn get_by_hashes(&self, hashes: &[String]) -> Result<Vec<Block>> {
        let records = sqlx::query_as::<_, Block>(
            r#"
            SELECT height, hash, num_txs, total_gas, proposer_address, timestamp
            FROM block
            WHERE hash = ANY($1)
            "#,
        )
        .bind(hashes)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Get a page of blocks, newest first
    pub async fn list(&self, offset: i64, limit: i64) -> Result<Vec<Block>> {
        let records = sqlx::query_as::<_, Block>(
            r#"
            SELECT height, hash, num_txs, total_gas, proposer_address, timestamp
            FROM block
            ORDER BY height DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    pub async fn count(&self) -> Result<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM block")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }
}

#[async_trait]
impl RangedFetch for BlockRepository {
    type Item = Block;
    type Filter = ();

    fn name(&self) -> &str {
        "block"
    }

    async fn fetch_range(&self, _: &(), offset: i64, limit: i64) -> Result<Window<Block>> {
        let (items, total_count) = tokio::try_join!(self.list(offset, limit), self.count())?;
        Ok(Window { items, total_count })
    }
}
