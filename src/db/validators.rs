//! Validator database repository
//!
//! A validator is spread over several one-row-per-validator tables; they are
//! flattened into a single [`Validator`] record with left joins so that a
//! validator missing e.g. signing info still loads.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::graphql::pagination::{RangedFetch, Window};

/// Validator record, joined from the `validator*` tables
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Validator {
    pub consensus_address: String,
    pub consensus_pubkey: String,
    pub operator_address: Option<String>,
    pub self_delegate_address: Option<String>,
    pub moniker: Option<String>,
    pub identity: Option<String>,
    pub avatar_url: Option<String>,
    pub website: Option<String>,
    pub security_contact: Option<String>,
    pub details: Option<String>,
    pub status: Option<i32>,
    pub jailed: Option<bool>,
    pub tombstoned: Option<bool>,
    pub voting_power: Option<Decimal>,
    /// Share of the total voting power of all validators, `0.0..=1.0`
    pub relative_voting_power: Option<f64>,
    pub commission: Option<Decimal>,
    pub min_self_delegation: Option<Decimal>,
    pub start_height: Option<i64>,
    pub missed_blocks_counter: Option<i64>,
    pub jailed_until: Option<NaiveDateTime>,
}

/// Per-validator proposal count
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProposalCount {
    pub consensus_address: String,
    pub proposal_count: i64,
}

/// Chain-wide reward parameters next to one validator's commission rate
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct RewardInputs {
    pub consensus_address: String,
    pub commission: Option<f64>,
    /// Current annual inflation rate
    pub inflation: Option<f64>,
    /// Total supply of the staking denom
    pub total_supply: Option<f64>,
    pub bonded_tokens: Option<f64>,
}

impl RewardInputs {
    /// Annual return of a delegation to this validator: the annual
    /// provisions shared over the bonded tokens, less commission
    pub fn expected_returns(&self) -> Option<f64> {
        let inflation = self.inflation?;
        let total_supply = self.total_supply?;
        let bonded_tokens = self.bonded_tokens?;
        if bonded_tokens <= 0.0 {
            return None;
        }
        let commission = self.commission.unwrap_or(0.0).clamp(0.0, 1.0);
        Some(inflation * total_supply * (1.0 - commission) / bonded_tokens)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ValidatorStatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

#[derive(Debug, Clone, Default)]
pub struct ValidatorFilter {
    pub status: ValidatorStatusFilter,
}

const VALIDATOR_SELECT: &str = r#"
    SELECT v.consensus_address,
           v.consensus_pubkey,
           i.operator_address,
           i.self_delegate_address,
           d.moniker,
           d.identity,
           d.avatar_url,
           d.website,
           d.security_contact,
           d.details,
           s.status,
           s.jailed,
           s.tombstoned,
           vp.voting_power::NUMERIC AS voting_power,
           vp.voting_power::FLOAT8 / NULLIF(t.total, 0) AS relative_voting_power,
           c.commission::NUMERIC AS commission,
           c.min_self_delegation::NUMERIC AS min_self_delegation,
           si.start_height,
           si.missed_blocks_counter,
           si.jailed_until
    FROM validator v
    LEFT JOIN validator_info i ON i.consensus_address = v.consensus_address
    LEFT JOIN validator_description d ON d.validator_address = v.consensus_address
    LEFT JOIN validator_status s ON s.validator_address = v.consensus_address
    LEFT JOIN validator_voting_power vp ON vp.validator_address = v.consensus_address
    LEFT JOIN validator_commission c ON c.validator_address = v.consensus_address
    LEFT JOIN validator_signing_info si ON si.validator_address = v.consensus_address
    CROSS JOIN (SELECT SUM(voting_power)::FLOAT8 AS total FROM validator_voting_power) t
"#;

/// `$1` is the status filter: 0 all, 1 bonded only, 2 everything else.
/// Status 3 is `BOND_STATUS_BONDED`.
const STATUS_CONDITION: &str = r#"
    ($1 = 0
     OR ($1 = 1 AND s.status = 3)
     OR ($1 = 2 AND s.status IS DISTINCT FROM 3))
"#;

impl ValidatorStatusFilter {
    fn as_param(self) -> i32 {
        match self {
            Self::All => 0,
            Self::Active => 1,
            Self::Inactive => 2,
        }
    }
}

pub struct ValidatorRepository {
    pool: PgPool,
}

impl ValidatorRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get validators by consensus address, in no particular order
    pub async fn get_by_consensus_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<Validator>> {
        let sql = format!("{} WHERE v.consensus_address = ANY($1)", VALIDATOR_SELECT);
        let records = sqlx::query_as::<_, Validator>(&sql)
            .bind(addresses)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Get validators by the account address they self-delegate from
    pub async fn get_by_self_delegate_addresses(
        &self,
        addresses: &[String],
    ) -> Result<Vec<Validator>> {
        let sql = format!("{} WHERE i.self_delegate_address = ANY($1)", VALIDATOR_SELECT);
        let records = sqlx::query_as::<_, Validator>(&sql)
            .bind(addresses)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    /// Find a validator by consensus, operator or self-delegate address
    pub async fn find_by_address(&self, address: &str) -> Result<Option<Validator>> {
        let sql = format!(
            r#"
            {}
            WHERE v.consensus_address = $1
               OR i.operator_address = $1
               OR i.self_delegate_address = $1
            LIMIT 1
            "#,
            VALIDATOR_SELECT
        );
        let record = sqlx::query_as::<_, Validator>(&sql)
            .bind(address)
            .fetch_optional(&self.pool)
            .await?;

        Ok(record)
    }

    /// Get a page of validators, highest voting power first
    pub async fn list(
        &self,
        filter: &ValidatorFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Validator>> {
        let sql = format!(
            r#"
            {}
            WHERE {}
            ORDER BY vp.voting_power DESC NULLS LAST, v.consensus_address
            LIMIT $2 OFFSET $3
            "#,
            VALIDATOR_SELECT, STATUS_CONDITION
        );
        let records = sqlx::query_as::<_, Validator>(&sql)
            .bind(filter.status.as_param())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    pub async fn count(&self, filter: &ValidatorFilter) -> Result<i64> {
        let sql = format!(
            r#"
            SELECT COUNT(*)
            FROM validator v
            LEFT JOIN validator_status s ON s.validator_address = v.consensus_address
            WHERE {}
            "#,
            STATUS_CONDITION
        );
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.status.as_param())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Number of distinct proposals each validator's self-delegate account voted on
    pub async fn participated_counts(&self, addresses: &[String]) -> Result<Vec<ProposalCount>> {
        let records = sqlx::query_as::<_, ProposalCount>(
            r#"
            SELECT i.consensus_address, COUNT(DISTINCT pv.proposal_id) AS proposal_count
            FROM validator_info i
            JOIN proposal_vote pv ON pv.voter_address = i.self_delegate_address
            WHERE i.consensus_address = ANY($1)
            GROUP BY i.consensus_address
            "#,
        )
        .bind(addresses)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Number of proposals that reached voting while each validator was
    /// signing blocks, i.e. the proposals it could have voted on
    pub async fn relative_proposal_counts(
        &self,
        addresses: &[String],
    ) -> Result<Vec<ProposalCount>> {
        let records = sqlx::query_as::<_, ProposalCount>(
            r#"
            SELECT si.validator_address AS consensus_address, COUNT(p.id) AS proposal_count
            FROM validator_signing_info si
            JOIN block b ON b.height = si.start_height
            JOIN proposal p ON p.voting_end_time >= b.timestamp
            WHERE si.validator_address = ANY($1)
              AND p.voting_start_time IS NOT NULL
            GROUP BY si.validator_address
            "#,
        )
        .bind(addresses)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Inputs of the expected return computation for each validator with
    /// a commission record. `denom` selects the staking coin in the supply.
    pub async fn reward_inputs(
        &self,
        addresses: &[String],
        denom: &str,
    ) -> Result<Vec<RewardInputs>> {
        let records = sqlx::query_as::<_, RewardInputs>(
            r#"
            SELECT c.validator_address AS consensus_address,
                   c.commission::FLOAT8 AS commission,
                   (SELECT value::FLOAT8 FROM inflation ORDER BY height DESC LIMIT 1) AS inflation,
                   (SELECT SUM(s.amount::NUMERIC)::FLOAT8
                    FROM supply
                    CROSS JOIN LATERAL UNNEST(supply.coins) AS s(denom, amount)
                    WHERE s.denom = $2) AS total_supply,
                   (SELECT bonded_tokens::FLOAT8 FROM staking_pool ORDER BY height DESC LIMIT 1)
                       AS bonded_tokens
            FROM validator_commission c
            WHERE c.validator_address = ANY($1)
            "#,
        )
        .bind(addresses)
        .bind(denom)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }
}

#[async_trait]
impl RangedFetch for ValidatorRepository {
    type Item = Validator;
    type Filter = ValidatorFilter;

    fn name(&self) -> &str {
        "validator"
    }

    async fn fetch_range(
        &self,
        filter: &ValidatorFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Window<Validator>> {
        let (items, total_count) =
            tokio::try_join!(self.list(filter, offset, limit), self.count(filter))?;
        Ok(Window { items, total_count })
    }
}
