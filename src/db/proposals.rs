//! Proposal database repository
//!
//! Covers `proposal` and its satellite tables `proposal_tally_result`,
//! `proposal_vote` and `proposal_deposit`. Vote tallies and deposit amounts
//! are stored as text by the indexer and cast to `NUMERIC` on the way out.

use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDateTime;
use rust_decimal::Decimal;
use sqlx::PgPool;

use crate::graphql::pagination::{RangedFetch, Window};

pub const STATUS_DEPOSIT_PERIOD: &str = "PROPOSAL_STATUS_DEPOSIT_PERIOD";
pub const STATUS_VOTING_PERIOD: &str = "PROPOSAL_STATUS_VOTING_PERIOD";
pub const STATUS_PASSED: &str = "PROPOSAL_STATUS_PASSED";
pub const STATUS_REJECTED: &str = "PROPOSAL_STATUS_REJECTED";
pub const STATUS_FAILED: &str = "PROPOSAL_STATUS_FAILED";
pub const STATUS_INVALID: &str = "PROPOSAL_STATUS_INVALID";

/// Proposal record from database
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct Proposal {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub proposal_route: String,
    pub proposal_type: String,
    pub submit_time: NaiveDateTime,
    pub deposit_end_time: Option<NaiveDateTime>,
    pub voting_start_time: Option<NaiveDateTime>,
    pub voting_end_time: Option<NaiveDateTime>,
    pub proposer_address: String,
    pub status: Option<String>,
}

/// Final or running tally of a proposal
#[derive(Debug, Clone, PartialEq, sqlx::FromRow)]
pub struct ProposalTallyResult {
    pub proposal_id: i32,
    pub yes: Decimal,
    pub no: Decimal,
    pub no_with_veto: Decimal,
    pub abstain: Decimal,
    pub height: i64,
}

/// A single vote cast on a proposal
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProposalVote {
    pub proposal_id: i32,
    pub voter_address: String,
    pub option: String,
    pub timestamp: Option<NaiveDateTime>,
    pub height: i64,
}

/// A deposit made to a proposal. The indexer stores the amount as a
/// `COIN[]`; it is read back as parallel denom and amount arrays.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ProposalDeposit {
    pub proposal_id: i32,
    pub depositor_address: String,
    pub denoms: Vec<String>,
    pub amounts: Vec<Decimal>,
    pub timestamp: Option<NaiveDateTime>,
    pub height: i64,
}

impl ProposalDeposit {
    /// `(denom, amount)` pairs of the deposited coins
    pub fn coins(&self) -> impl Iterator<Item = (&str, Decimal)> + '_ {
        self.denoms
            .iter()
            .map(String::as_str)
            .zip(self.amounts.iter().copied())
    }
}

/// Sum of deposits in one denom for a proposal
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct DepositTotal {
    pub proposal_id: i32,
    pub total: Decimal,
}

/// Filter for proposal listings. Both parts are optional and combine with AND.
#[derive(Debug, Clone, Default)]
pub struct ProposalFilter {
    /// Stored status strings to include
    pub statuses: Option<Vec<String>>,
    /// Only proposals this address submitted, voted on or deposited to
    pub related_address: Option<String>,
}

const PROPOSAL_COLUMNS: &str = r#"
    id, title, description, proposal_route, proposal_type, submit_time,
    deposit_end_time, voting_start_time, voting_end_time, proposer_address, status
"#;

const PROPOSAL_FILTER: &str = r#"
    ($1::TEXT[] IS NULL OR p.status = ANY($1))
    AND (
        $2::TEXT IS NULL
        OR p.proposer_address = $2
        OR EXISTS (SELECT 1 FROM proposal_vote v WHERE v.proposal_id = p.id AND v.voter_address = $2)
        OR EXISTS (SELECT 1 FROM proposal_deposit d WHERE d.proposal_id = p.id AND d.depositor_address = $2)
    )
"#;

pub struct ProposalRepository {
    pool: PgPool,
}

impl ProposalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Get proposals by id, in no particular order
    pub async fn get_by_ids(&self, ids: &[i32]) -> Result<Vec<Proposal>> {
        let records = sqlx::query_as::<_, Proposal>(&format!(
            "SELECT {} FROM proposal WHERE id = ANY($1)",
            PROPOSAL_COLUMNS
        ))
        .bind(ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Get a page of proposals matching `filter`, newest first
    pub async fn list(
        &self,
        filter: &ProposalFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Vec<Proposal>> {
        let sql = format!(
            r#"
            SELECT {}
            FROM proposal p
            WHERE {}
            ORDER BY p.submit_time DESC, p.id DESC
            LIMIT $3 OFFSET $4
            "#,
            PROPOSAL_COLUMNS, PROPOSAL_FILTER
        );
        let records = sqlx::query_as::<_, Proposal>(&sql)
            .bind(filter.statuses.as_deref())
            .bind(filter.related_address.as_deref())
            .bind(limit)
            .bind(offset)
            .fetch_all(&self.pool)
            .await?;

        Ok(records)
    }

    pub async fn count(&self, filter: &ProposalFilter) -> Result<i64> {
        let sql = format!("SELECT COUNT(*) FROM proposal p WHERE {}", PROPOSAL_FILTER);
        let count: i64 = sqlx::query_scalar(&sql)
            .bind(filter.statuses.as_deref())
            .bind(filter.related_address.as_deref())
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// Tally results for a set of proposals
    pub async fn tally_results(&self, proposal_ids: &[i32]) -> Result<Vec<ProposalTallyResult>> {
        let records = sqlx::query_as::<_, ProposalTallyResult>(
            r#"
            SELECT proposal_id,
                   yes::NUMERIC AS yes,
                   no::NUMERIC AS no,
                   no_with_veto::NUMERIC AS no_with_veto,
                   abstain::NUMERIC AS abstain,
                   height
            FROM proposal_tally_result
            WHERE proposal_id = ANY($1)
            "#,
        )
        .bind(proposal_ids)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Sum of deposit amounts in `denom`, one row per proposal with deposits
    pub async fn deposit_totals(
        &self,
        proposal_ids: &[i32],
        denom: &str,
    ) -> Result<Vec<DepositTotal>> {
        let records = sqlx::query_as::<_, DepositTotal>(
            r#"
            SELECT d.proposal_id, COALESCE(SUM(c.amount::NUMERIC), 0) AS total
            FROM proposal_deposit d
            CROSS JOIN LATERAL UNNEST(d.amount) AS c(denom, amount)
            WHERE d.proposal_id = ANY($1) AND c.denom = $2
            GROUP BY d.proposal_id
            "#,
        )
        .bind(proposal_ids)
        .bind(denom)
        .fetch_all(&self.pool)
        .await?;

        Ok(records)
    }

    /// Ranged access to the votes of a single proposal
    pub fn votes(&self) -> ProposalVotes {
        ProposalVotes {
            pool: self.pool.clone(),
        }
    }

    /// Ranged access to the deposits of a single proposal
    pub fn deposits(&self) -> ProposalDeposits {
        ProposalDeposits {
            pool: self.pool.clone(),
        }
    }
}

#[async_trait]
impl RangedFetch for ProposalRepository {
    type Item = Proposal;
    type Filter = ProposalFilter;

    fn name(&self) -> &str {
        "proposal"
    }

    async fn fetch_range(
        &self,
        filter: &ProposalFilter,
        offset: i64,
        limit: i64,
    ) -> Result<Window<Proposal>> {
        let (items, total_count) =
            tokio::try_join!(self.list(filter, offset, limit), self.count(filter))?;
        Ok(Window { items, total_count })
    }
}

/// Votes of one proposal, latest first. The filter is the proposal id.
pub struct ProposalVotes {
    pool: PgPool,
}

#[async_trait]
impl RangedFetch for ProposalVotes {
    type Item = ProposalVote;
    type Filter = i32;

    fn name(&self) -> &str {
        "proposal_vote"
    }

    async fn fetch_range(
        &self,
        proposal_id: &i32,
        offset: i64,
        limit: i64,
    ) -> Result<Window<ProposalVote>> {
        let items = sqlx::query_as::<_, ProposalVote>(
            r#"
            SELECT proposal_id, voter_address, option, timestamp, height
            FROM proposal_vote
            WHERE proposal_id = $1
            ORDER BY height DESC, voter_address
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(*proposal_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM proposal_vote WHERE proposal_id = $1",
        )
        .bind(*proposal_id)
        .fetch_one(&self.pool);

        let (items, total_count) = tokio::try_join!(items, total)?;
        Ok(Window { items, total_count })
    }
}

/// Deposits of one proposal, latest first. The filter is the proposal id.
pub struct ProposalDeposits {
    pool: PgPool,
}

#[async_trait]
impl RangedFetch for ProposalDeposits {
    type Item = ProposalDeposit;
    type Filter = i32;

    fn name(&self) -> &str {
        "proposal_deposit"
    }

    async fn fetch_range(
        &self,
        proposal_id: &i32,
        offset: i64,
        limit: i64,
    ) -> Result<Window<ProposalDeposit>> {
        let items = sqlx::query_as::<_, ProposalDeposit>(
            r#"
            SELECT d.proposal_id,
                   d.depositor_address,
                   ARRAY(
                       SELECT c.denom FROM UNNEST(d.amount) WITH ORDINALITY AS c(denom, amount, n)
                       ORDER BY c.n
                   ) AS denoms,
                   ARRAY(
                       SELECT c.amount::NUMERIC FROM UNNEST(d.amount) WITH ORDINALITY AS c(denom, amount, n)
                       ORDER BY c.n
                   ) AS amounts,
                   d.timestamp,
                   d.height
            FROM proposal_deposit d
            WHERE d.proposal_id = $1
            ORDER BY d.height DESC, d.depositor_address
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(*proposal_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool);

        let total = sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM proposal_deposit WHERE proposal_id = $1",
        )
        .bind(*proposal_id)
        .fetch_one(&self.pool);

        let (items, total_count) = tokio::try_join!(items, total)?;
        Ok(Window { items, total_count })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deposit_coins_pair_denoms_with_amounts() {
        let deposit = ProposalDeposit {
            proposal_id: 4,
            depositor_address: "like1depositor".into(),
            denoms: vec!["nanolike".into(), "ibc/ATOM".into()],
            amounts: vec![Decimal::from(1_000_000), Decimal::from(3)],
            timestamp: None,
            height: 120,
        };
        let coins: Vec<_> = deposit.coins().collect();
        assert_eq!(
            coins,
            vec![("nanolike", Decimal::from(1_000_000)), ("ibc/ATOM", Decimal::from(3))]
        );
    }
}
