//! Database connection and repositories
//!
//! Reads the chain data written by the indexer (bdjuno schema) plus the
//! explorer's own `reaction` table. Every repository is read-only.

pub mod blocks;
pub mod proposals;
pub mod reactions;
pub mod validators;

use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;

pub use blocks::{Block, BlockRepository};
pub use proposals::{
    DepositTotal, Proposal, ProposalDeposit, ProposalDeposits, ProposalFilter, ProposalRepository,
    ProposalTallyResult, ProposalVote, ProposalVotes,
};
pub use reactions::{Reaction, ReactionRepository};
pub use validators::{
    ProposalCount, RewardInputs, Validator, ValidatorFilter, ValidatorRepository,
    ValidatorStatusFilter,
};

/// Database wrapper providing connection pool access
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database wrapper from an existing pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Create a new database connection pool
    pub async fn connect(url: &str, max_connections: u32) -> Result<Self> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(10))
            .connect(url)
            .await
            .context("Failed to connect to database")?;

        Ok(Self { pool })
    }

    /// Round-trip a trivial query, used by the readiness probe
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    /// Get a block repository
    pub fn blocks(&self) -> BlockRepository {
        BlockRepository::new(self.pool.clone())
    }

    /// Get a proposal repository
    pub fn proposals(&self) -> ProposalRepository {
        ProposalRepository::new(self.pool.clone())
    }

    /// Get a validator repository
    pub fn validators(&self) -> ValidatorRepository {
        ValidatorRepository::new(self.pool.clone())
    }

    /// Get a reaction repository
    pub fn reactions(&self) -> ReactionRepository {
        ReactionRepository::new(self.pool.clone())
    }
}
