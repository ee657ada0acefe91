//! GraphQL type definitions
//!
//! Entity objects are resolved straight from the database records; derived
//! and related fields go through the request's loaders so that a list of N
//! parents costs one query per relation rather than N.

use async_graphql::{Context, Enum, InputObject, Object, Result, SimpleObject, Union};
use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use crate::db::{
    Block, Database, Proposal, ProposalDeposit, ProposalTallyResult, ProposalVote, Reaction,
    Validator, ValidatorStatusFilter as StoredValidatorStatus,
};
use crate::define_connection;
use crate::graphql::helpers::{
    FieldResultExt, loaders, outstanding_option, page_request, registry, tally_visible, uptime,
};
use crate::graphql::pagination::Connection;
use crate::loader::{BatchFetch, BatchLoader};
use crate::node::{GlobalId, Node, NodeEntity};

// ============================================================================
// Enums
// ============================================================================

/// Lifecycle status of a governance proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatus {
    Unspecified,
    DepositPeriod,
    VotingPeriod,
    Passed,
    Rejected,
    Failed,
    Invalid,
}

impl ProposalStatus {
    pub fn from_stored(status: &str) -> Self {
        match status {
            "PROPOSAL_STATUS_DEPOSIT_PERIOD" => Self::DepositPeriod,
            "PROPOSAL_STATUS_VOTING_PERIOD" => Self::VotingPeriod,
            "PROPOSAL_STATUS_PASSED" => Self::Passed,
            "PROPOSAL_STATUS_REJECTED" => Self::Rejected,
            "PROPOSAL_STATUS_FAILED" => Self::Failed,
            "PROPOSAL_STATUS_INVALID" => Self::Invalid,
            _ => Self::Unspecified,
        }
    }
}

/// Kind of governance proposal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum ProposalType {
    Text,
    ParameterChange,
    CommunityPoolSpend,
    SoftwareUpgrade,
    CancelSoftwareUpgrade,
}

impl ProposalType {
    /// Map the indexer's content type name; unknown types have no GraphQL value
    pub fn from_stored(proposal_type: &str) -> Option<Self> {
        let name = proposal_type.rsplit('.').next().unwrap_or(proposal_type);
        match name {
            "TextProposal" => Some(Self::Text),
            "ParameterChangeProposal" => Some(Self::ParameterChange),
            "CommunityPoolSpendProposal" => Some(Self::CommunityPoolSpend),
            "SoftwareUpgradeProposal" => Some(Self::SoftwareUpgrade),
            "CancelSoftwareUpgradeProposal" => Some(Self::CancelSoftwareUpgrade),
            _ => None,
        }
    }
}

/// Option a vote was cast for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum VoteOption {
    Yes,
    No,
    NoWithVeto,
    Abstain,
}

impl VoteOption {
    pub fn from_stored(option: &str) -> Option<Self> {
        match option {
            "VOTE_OPTION_YES" => Some(Self::Yes),
            "VOTE_OPTION_NO" => Some(Self::No),
            "VOTE_OPTION_NO_WITH_VETO" => Some(Self::NoWithVeto),
            "VOTE_OPTION_ABSTAIN" => Some(Self::Abstain),
            _ => None,
        }
    }
}

/// Status group for proposal listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum ProposalStatusFilter {
    Voting,
    Depositing,
    Passed,
    Rejected,
    Failed,
}

/// Bonding status group for validator listings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Enum)]
#[graphql(rename_items = "SCREAMING_SNAKE_CASE")]
pub enum ValidatorStatusFilter {
    #[default]
    All,
    Active,
    Inactive,
}

impl From<ValidatorStatusFilter> for StoredValidatorStatus {
    fn from(filter: ValidatorStatusFilter) -> Self {
        match filter {
            ValidatorStatusFilter::All => StoredValidatorStatus::All,
            ValidatorStatusFilter::Active => StoredValidatorStatus::Active,
            ValidatorStatusFilter::Inactive => StoredValidatorStatus::Inactive,
        }
    }
}

// ============================================================================
// Inputs
// ============================================================================

#[derive(Debug, Clone, Default, InputObject)]
pub struct QueryProposalsInput {
    /// Page size
    pub first: Option<i32>,
    /// Number of proposals already seen (the cursor of the last one)
    pub after: Option<i32>,
    /// Restrict to a status group
    pub filter: Option<ProposalStatusFilter>,
    /// Only proposals this address submitted, voted on or deposited to.
    /// Takes precedence over `filter`.
    pub related_address: Option<String>,
}

#[derive(Debug, Clone, Default, InputObject)]
pub struct QueryValidatorsInput {
    pub first: Option<i32>,
    pub after: Option<i32>,
    pub filter: Option<ValidatorStatusFilter>,
}

// ============================================================================
// Connections
// ============================================================================

define_connection!(BlockConnection, BlockEdge, Block);
define_connection!(ProposalConnection, ProposalEdge, Proposal);
define_connection!(ValidatorConnection, ValidatorEdge, Validator);
define_connection!(ProposalVoteConnection, ProposalVoteEdge, ProposalVote);
define_connection!(ProposalDepositConnection, ProposalDepositEdge, ProposalDeposit);

// ============================================================================
// Plain objects and unions
// ============================================================================

#[derive(SimpleObject, Debug, Clone, PartialEq)]
pub struct Coin {
    pub denom: String,
    pub amount: Decimal,
}

/// A bare string where a union member is expected
#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct StringObject {
    pub value: String,
}

/// Union of the validator owning an account, or the account address itself
macro_rules! account_union {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Union, Debug, Clone)]
        pub enum $name {
            Validator(Validator),
            StringObject(StringObject),
        }

        impl $name {
            /// Resolve `address` through a loader keyed by self-delegate account
            pub(crate) async fn load<F>(
                loader: &BatchLoader<F>,
                address: &str,
            ) -> crate::error::Result<Self>
            where
                F: BatchFetch<Value = Validator>,
            {
                Ok(match loader.load(address).await? {
                    Some(validator) => Self::Validator(validator),
                    None => Self::StringObject(StringObject {
                        value: address.to_string(),
                    }),
                })
            }
        }
    };
}

account_union!(
    /// Who cast a vote: a validator, or any other account
    ProposalVoter
);
account_union!(
    /// Who made a deposit: a validator, or any other account
    ProposalDepositor
);
// ============================================================================
// Entity objects
// ============================================================================

#[Object]
impl Block {
    async fn id(&self, ctx: &Context<'_>) -> Result<GlobalId> {
        registry(ctx)?.encode(self).gql()
    }

    async fn height(&self) -> i64 {
        self.height
    }

    async fn hash(&self) -> &str {
        &self.hash
    }

    async fn num_txs(&self) -> Option<i32> {
        self.num_txs
    }

    async fn total_gas(&self) -> Option<i64> {
        self.total_gas
    }

    async fn proposer_address(&self) -> Option<&str> {
        self.proposer_address.as_deref()
    }

    async fn timestamp(&self) -> NaiveDateTime {
        self.timestamp
    }

    /// Validator that proposed the block
    async fn proposer(&self, ctx: &Context<'_>) -> Result<Option<Validator>> {
        let Some(address) = self.proposer_address.as_deref() else {
            return Ok(None);
        };
        let id = GlobalId::new(Validator::TYPE_TAG, address);
        match loaders(ctx)?.nodes.load_optional(&id).await.gql()? {
            Some(Node::Validator(validator)) => Ok(Some(validator)),
            _ => Ok(None),
        }
    }
}

#[Object]
impl Proposal {
    async fn id(&self, ctx: &Context<'_>) -> Result<GlobalId> {
        registry(ctx)?.encode(self).gql()
    }

    /// On-chain proposal number
    async fn proposal_id(&self) -> i32 {
        self.id
    }

    async fn title(&self) -> &str {
        &self.title
    }

    async fn description(&self) -> &str {
        &self.description
    }

    async fn proposal_route(&self) -> &str {
        &self.proposal_route
    }

    #[graphql(name = "type")]
    async fn proposal_type(&self) -> Option<ProposalType> {
        ProposalType::from_stored(&self.proposal_type)
    }

    async fn status(&self) -> ProposalStatus {
        self.status
            .as_deref()
            .map(ProposalStatus::from_stored)
            .unwrap_or(ProposalStatus::Unspecified)
    }

    async fn submit_time(&self) -> NaiveDateTime {
        self.submit_time
    }

    async fn deposit_end_time(&self) -> Option<NaiveDateTime> {
        self.deposit_end_time
    }

    async fn voting_start_time(&self) -> Option<NaiveDateTime> {
        self.voting_start_time
    }

    async fn voting_end_time(&self) -> Option<NaiveDateTime> {
        self.voting_end_time
    }

    async fn proposer_address(&self) -> &str {
        &self.proposer_address
    }

    /// Sum of deposits in the chain's staking denom
    async fn deposit_total(&self, ctx: &Context<'_>) -> Result<Decimal> {
        let total = loaders(ctx)?
            .deposit_totals
            .load(self.id.to_string())
            .await
            .gql()?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }

    /// Vote tally; null while depositing and for failed or invalid proposals
    async fn tally_result(&self, ctx: &Context<'_>) -> Result<Option<ProposalTallyResult>> {
        if !tally_visible(self.status.as_deref()) {
            return Ok(None);
        }
        loaders(ctx)?.tallies.load(self.id.to_string()).await.gql()
    }

    async fn votes(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<i32>,
    ) -> Result<ProposalVoteConnection> {
        let request = page_request(ctx, first, after)?;
        let db = ctx.data::<Database>()?;
        let conn = Connection::page(&db.proposals().votes(), &self.id, request)
            .await
            .gql()?;
        Ok(ProposalVoteConnection::from_connection(conn))
    }

    async fn deposits(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<i32>,
    ) -> Result<ProposalDepositConnection> {
        let request = page_request(ctx, first, after)?;
        let db = ctx.data::<Database>()?;
        let conn = Connection::page(&db.proposals().deposits(), &self.id, request)
            .await
            .gql()?;
        Ok(ProposalDepositConnection::from_connection(conn))
    }

    async fn reactions(&self, ctx: &Context<'_>) -> Result<Vec<Reaction>> {
        let target = registry(ctx)?.encode(self).gql()?.to_wire();
        let reactions = loaders(ctx)?.reactions.load(target).await.gql()?;
        Ok(reactions.unwrap_or_default())
    }
}

#[Object]
impl ProposalTallyResult {
    async fn yes(&self) -> Decimal {
        self.yes
    }

    async fn no(&self) -> Decimal {
        self.no
    }

    async fn no_with_veto(&self) -> Decimal {
        self.no_with_veto
    }

    async fn abstain(&self) -> Decimal {
        self.abstain
    }

    /// Option with strictly the most votes; null on a tie or with no votes
    async fn outstanding_option(&self) -> Option<VoteOption> {
        outstanding_option(self)
    }

    async fn height(&self) -> i64 {
        self.height
    }
}

#[Object]
impl ProposalVote {
    async fn voter_address(&self) -> &str {
        &self.voter_address
    }

    async fn voter(&self, ctx: &Context<'_>) -> Result<ProposalVoter> {
        ProposalVoter::load(&loaders(ctx)?.validator_accounts, &self.voter_address)
            .await
            .gql()
    }

    async fn option(&self) -> Option<VoteOption> {
        VoteOption::from_stored(&self.option)
    }

    async fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    async fn height(&self) -> i64 {
        self.height
    }
}

#[Object]
impl ProposalDeposit {
    async fn depositor_address(&self) -> &str {
        &self.depositor_address
    }

    async fn depositor(&self, ctx: &Context<'_>) -> Result<ProposalDepositor> {
        ProposalDepositor::load(&loaders(ctx)?.validator_accounts, &self.depositor_address)
            .await
            .gql()
    }

    async fn amount(&self) -> Vec<Coin> {
        self.coins()
            .map(|(denom, amount)| Coin {
                denom: denom.to_string(),
                amount,
            })
            .collect()
    }

    async fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    async fn height(&self) -> i64 {
        self.height
    }
}

#[Object]
impl Validator {
    async fn id(&self, ctx: &Context<'_>) -> Result<GlobalId> {
        registry(ctx)?.encode(self).gql()
    }

    async fn consensus_address(&self) -> &str {
        &self.consensus_address
    }

    async fn consensus_pubkey(&self) -> &str {
        &self.consensus_pubkey
    }

    async fn operator_address(&self) -> Option<&str> {
        self.operator_address.as_deref()
    }

    async fn self_delegation_address(&self) -> Option<&str> {
        self.self_delegate_address.as_deref()
    }

    async fn moniker(&self) -> Option<&str> {
        self.moniker.as_deref()
    }

    async fn identity(&self) -> Option<&str> {
        self.identity.as_deref()
    }

    async fn avatar_url(&self) -> Option<&str> {
        self.avatar_url.as_deref()
    }

    async fn website(&self) -> Option<&str> {
        self.website.as_deref()
    }

    async fn security_contact(&self) -> Option<&str> {
        self.security_contact.as_deref()
    }

    async fn details(&self) -> Option<&str> {
        self.details.as_deref()
    }

    /// Bonding status code (3 = bonded)
    async fn status(&self) -> Option<i32> {
        self.status
    }

    async fn jailed(&self) -> bool {
        self.jailed.unwrap_or(false)
    }

    async fn tombstoned(&self) -> bool {
        self.tombstoned.unwrap_or(false)
    }

    async fn jailed_until(&self) -> Option<NaiveDateTime> {
        self.jailed_until
    }

    async fn voting_power(&self) -> Option<Decimal> {
        self.voting_power
    }

    /// Share of the total voting power, `0..1`
    async fn relative_voting_power(&self) -> Option<f64> {
        self.relative_voting_power
    }

    async fn commission(&self) -> Option<Decimal> {
        self.commission
    }

    async fn min_self_delegation(&self) -> Option<Decimal> {
        self.min_self_delegation
    }

    /// Fraction of the current signing window the validator signed
    async fn uptime(&self, ctx: &Context<'_>) -> Result<Option<f64>> {
        let config = ctx.data::<crate::config::Config>()?;
        Ok(uptime(self.missed_blocks_counter, config.signed_blocks_window))
    }

    async fn participated_proposal_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let count = loaders(ctx)?
            .participation
            .load(self.consensus_address.as_str())
            .await
            .gql()?;
        Ok(count.unwrap_or(0))
    }

    /// Expected annual return of delegating to this validator, after commission
    async fn expected_returns(&self, ctx: &Context<'_>) -> Result<Option<f64>> {
        loaders(ctx)?
            .expected_returns
            .load(self.consensus_address.as_str())
            .await
            .gql()
    }

    /// Proposals that went to vote while the validator was signing blocks
    async fn relative_total_proposal_count(&self, ctx: &Context<'_>) -> Result<i64> {
        let count = loaders(ctx)?
            .relative_proposal_counts
            .load(self.consensus_address.as_str())
            .await
            .gql()?;
        Ok(count.unwrap_or(0))
    }
}

#[Object]
impl Reaction {
    async fn id(&self, ctx: &Context<'_>) -> Result<GlobalId> {
        registry(ctx)?.encode(self).gql()
    }

    /// Identifier of the node reacted to
    async fn target(&self) -> &str {
        &self.target
    }

    /// The node reacted to
    async fn target_node(&self, ctx: &Context<'_>) -> Result<Node> {
        let id = GlobalId::decode(&self.target).gql()?;
        loaders(ctx)?.nodes.load(&id).await.gql()
    }

    async fn address(&self) -> &str {
        &self.address
    }

    async fn reaction(&self) -> &str {
        &self.reaction
    }

    async fn created_at(&self) -> NaiveDateTime {
        self.created_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::test_support::{MemoryFetch, sample_validator};
    use assert_matches::assert_matches;

    #[tokio::test]
    async fn test_account_union_resolves_validators_and_plain_accounts() {
        let loader = BatchLoader::new(MemoryFetch::new(
            "validator_by_account",
            vec![sample_validator("likevalcons1a")],
            |v: &Validator| v.self_delegate_address.clone().unwrap_or_default(),
        ));

        let (validator, account, again) = tokio::join!(
            ProposalVoter::load(&loader, "like-likevalcons1a"),
            ProposalVoter::load(&loader, "like1someone"),
            ProposalDepositor::load(&loader, "like-likevalcons1a"),
        );

        assert_matches!(
            validator,
            Ok(ProposalVoter::Validator(v)) if v.consensus_address == "likevalcons1a"
        );
        assert_matches!(
            account,
            Ok(ProposalVoter::StringObject(s)) if s.value == "like1someone"
        );
        assert_matches!(again, Ok(ProposalDepositor::Validator(_)));
    }

    #[test]
    fn test_proposal_type_mapping() {
        assert_eq!(ProposalType::from_stored("TextProposal"), Some(ProposalType::Text));
        assert_eq!(
            ProposalType::from_stored("cosmos.upgrade.v1beta1.SoftwareUpgradeProposal"),
            Some(ProposalType::SoftwareUpgrade)
        );
        assert_eq!(ProposalType::from_stored("ClientUpdateProposal"), None);
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ProposalStatus::from_stored("PROPOSAL_STATUS_VOTING_PERIOD"),
            ProposalStatus::VotingPeriod
        );
        assert_eq!(ProposalStatus::from_stored("garbage"), ProposalStatus::Unspecified);
    }

    #[test]
    fn test_vote_option_mapping() {
        assert_eq!(
            VoteOption::from_stored("VOTE_OPTION_NO_WITH_VETO"),
            Some(VoteOption::NoWithVeto)
        );
        assert_eq!(VoteOption::from_stored("VOTE_OPTION_UNSPECIFIED"), None);
    }
}
