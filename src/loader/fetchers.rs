//! Database-backed batch fetches
//!
//! One fetch per node type (keyed by natural key) plus one per auxiliary
//! relation resolved on a parent object. Each issues a single `= ANY($1)`
//! query for the whole batch and re-keys the rows by the requested key.

use std::collections::HashMap;

use async_trait::async_trait;
use rust_decimal::Decimal;

use super::BatchFetch;
use crate::db::{Block, Database, Proposal, ProposalTallyResult, Reaction, Validator};

/// Parse numeric proposal keys. Keys that are not valid ids cannot exist in
/// the store, so they are dropped here and settle as "not found".
fn proposal_ids(entity: &str, keys: &[String]) -> Vec<i32> {
    keys.iter()
        .filter_map(|key| match key.parse::<i32>() {
            Ok(id) => Some(id),
            Err(_) => {
                tracing::debug!(entity, key = %key, "Skipping non-numeric proposal key");
                None
            }
        })
        .collect()
}

macro_rules! db_fetch {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone)]
        pub struct $name {
            db: Database,
        }

        impl $name {
            pub fn new(db: Database) -> Self {
                Self { db }
            }
        }
    };
}

db_fetch!(
    /// Blocks by hash
    BlockFetch
);
db_fetch!(
    /// Proposals by decimal id
    ProposalFetch
);
db_fetch!(
    /// Validators by consensus address
    ValidatorFetch
);
db_fetch!(
    /// Reactions by id
    ReactionFetch
);
db_fetch!(
    /// Tally results by proposal id
    TallyFetch
);
db_fetch!(
    /// Reactions grouped by target global id (wire form)
    ReactionsByTargetFetch
);
db_fetch!(
    /// Validators by the account they self-delegate from
    ValidatorByAccountFetch
);
db_fetch!(
    /// Proposals voted on, by validator consensus address
    ParticipationFetch
);
db_fetch!(
    /// Proposals a validator could have voted on, by consensus address
    RelativeProposalCountFetch
);

#[async_trait]
impl BatchFetch for BlockFetch {
    type Value = Block;

    fn name(&self) -> &str {
        "block"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Block>> {
        let blocks = self.db.blocks().get_by_hashes(keys).await?;
        Ok(blocks.into_iter().map(|b| (b.hash.clone(), b)).collect())
    }
}

#[async_trait]
impl BatchFetch for ProposalFetch {
    type Value = Proposal;

    fn name(&self) -> &str {
        "proposal"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Proposal>> {
        let ids = proposal_ids(self.name(), keys);
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let proposals = self.db.proposals().get_by_ids(&ids).await?;
        Ok(proposals.into_iter().map(|p| (p.id.to_string(), p)).collect())
    }
}

#[async_trait]
impl BatchFetch for ValidatorFetch {
    type Value = Validator;

    fn name(&self) -> &str {
        "validator"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Validator>> {
        let validators = self.db.validators().get_by_consensus_addresses(keys).await?;
        Ok(validators
            .into_iter()
            .map(|v| (v.consensus_address.clone(), v))
            .collect())
    }
}

#[async_trait]
impl BatchFetch for ValidatorByAccountFetch {
    type Value = Validator;

    fn name(&self) -> &str {
        "validator_by_account"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Validator>> {
        let validators = self.db.validators().get_by_self_delegate_addresses(keys).await?;
        Ok(validators
            .into_iter()
            .filter_map(|v| v.self_delegate_address.clone().map(|address| (address, v)))
            .collect())
    }
}

#[async_trait]
impl BatchFetch for ReactionFetch {
    type Value = Reaction;

    fn name(&self) -> &str {
        "reaction"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Reaction>> {
        let reactions = self.db.reactions().get_by_ids(keys).await?;
        Ok(reactions.into_iter().map(|r| (r.id.clone(), r)).collect())
    }
}

#[async_trait]
impl BatchFetch for TallyFetch {
    type Value = ProposalTallyResult;

    fn name(&self) -> &str {
        "proposal_tally_result"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, ProposalTallyResult>> {
        let ids = proposal_ids(self.name(), keys);
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let tallies = self.db.proposals().tally_results(&ids).await?;
        Ok(tallies
            .into_iter()
            .map(|t| (t.proposal_id.to_string(), t))
            .collect())
    }
}

/// Deposit totals in one denom by proposal id. Proposals without deposits
/// are absent from the result.
#[derive(Clone)]
pub struct DepositTotalFetch {
    db: Database,
    denom: String,
}

impl DepositTotalFetch {
    pub fn new(db: Database, denom: impl Into<String>) -> Self {
        Self {
            db,
            denom: denom.into(),
        }
    }
}

#[async_trait]
impl BatchFetch for DepositTotalFetch {
    type Value = Decimal;

    fn name(&self) -> &str {
        "proposal_deposit_total"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Decimal>> {
        let ids = proposal_ids(self.name(), keys);
        if ids.is_empty() {
            return Ok(HashMap::new());
        }
        let totals = self.db.proposals().deposit_totals(&ids, &self.denom).await?;
        Ok(totals
            .into_iter()
            .map(|t| (t.proposal_id.to_string(), t.total))
            .collect())
    }
}

#[async_trait]
impl BatchFetch for ReactionsByTargetFetch {
    type Value = Vec<Reaction>;

    fn name(&self) -> &str {
        "reaction_by_target"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Vec<Reaction>>> {
        let reactions = self.db.reactions().list_by_targets(keys).await?;

        // Every target resolves, to an empty list when nobody reacted
        let mut grouped: HashMap<String, Vec<Reaction>> =
            keys.iter().map(|k| (k.clone(), Vec::new())).collect();
        for reaction in reactions {
            if let Some(list) = grouped.get_mut(&reaction.target) {
                list.push(reaction);
            }
        }

        tracing::debug!(
            entity = self.name(),
            parent_count = keys.len(),
            "Grouped reactions by target"
        );
        Ok(grouped)
    }
}

#[async_trait]
impl BatchFetch for ParticipationFetch {
    type Value = i64;

    fn name(&self) -> &str {
        "validator_participation"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, i64>> {
        let counts = self.db.validators().participated_counts(keys).await?;
        Ok(counts
            .into_iter()
            .map(|c| (c.consensus_address, c.proposal_count))
            .collect())
    }
}

#[async_trait]
impl BatchFetch for RelativeProposalCountFetch {
    type Value = i64;

    fn name(&self) -> &str {
        "validator_relative_proposal_count"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, i64>> {
        let counts = self.db.validators().relative_proposal_counts(keys).await?;
        Ok(counts
            .into_iter()
            .map(|c| (c.consensus_address, c.proposal_count))
            .collect())
    }
}

/// Expected annual delegation returns by validator consensus address.
/// Validators whose returns cannot be computed are absent.
#[derive(Clone)]
pub struct ExpectedReturnFetch {
    db: Database,
    denom: String,
}

impl ExpectedReturnFetch {
    pub fn new(db: Database, denom: impl Into<String>) -> Self {
        Self {
            db,
            denom: denom.into(),
        }
    }
}

#[async_trait]
impl BatchFetch for ExpectedReturnFetch {
    type Value = f64;

    fn name(&self) -> &str {
        "validator_expected_returns"
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, f64>> {
        let inputs = self.db.validators().reward_inputs(keys, &self.denom).await?;
        Ok(inputs
            .into_iter()
            .filter_map(|i| i.expected_returns().map(|r| (i.consensus_address, r)))
            .collect())
    }
}
