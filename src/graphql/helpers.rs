// Helper functions shared across GraphQL query modules and object resolvers.

use std::sync::Arc;

use async_graphql::{Context, ErrorExtensions};

use crate::db::ProposalTallyResult;
use crate::db::proposals::{
    STATUS_DEPOSIT_PERIOD, STATUS_FAILED, STATUS_INVALID, STATUS_PASSED, STATUS_REJECTED,
    STATUS_VOTING_PERIOD,
};
use crate::error::ExplorerError;
use crate::graphql::pagination::{PageLimits, PageRequest};
use crate::graphql::types::{ProposalStatusFilter, VoteOption};
use crate::loader::RequestLoaders;
use crate::node::EntityRegistry;

/// Attach the error code extension when crossing into GraphQL
pub(crate) trait FieldResultExt<T> {
    fn gql(self) -> async_graphql::Result<T>;
}

impl<T> FieldResultExt<T> for Result<T, ExplorerError> {
    fn gql(self) -> async_graphql::Result<T> {
        self.map_err(|e| e.extend())
    }
}

pub(crate) fn loaders<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a RequestLoaders> {
    ctx.data::<RequestLoaders>()
}

pub(crate) fn registry<'a>(ctx: &Context<'a>) -> async_graphql::Result<&'a Arc<EntityRegistry>> {
    ctx.data::<Arc<EntityRegistry>>()
}

/// Validate `first`/`after` against the configured limits
pub(crate) fn page_request(
    ctx: &Context<'_>,
    first: Option<i32>,
    after: Option<i32>,
) -> async_graphql::Result<PageRequest> {
    let limits = ctx.data_opt::<PageLimits>().copied().unwrap_or_default();
    PageRequest::from_args(first, after, limits).gql()
}

/// The option with strictly the most votes. `None` when nobody voted or
/// when the lead is shared.
pub(crate) fn outstanding_option(tally: &ProposalTallyResult) -> Option<VoteOption> {
    let options = [
        (VoteOption::Yes, tally.yes),
        (VoteOption::No, tally.no),
        (VoteOption::NoWithVeto, tally.no_with_veto),
        (VoteOption::Abstain, tally.abstain),
    ];

    let max = options.iter().map(|(_, votes)| *votes).max()?;
    if max.is_zero() {
        return None;
    }

    let mut leaders = options.iter().filter(|(_, votes)| *votes == max);
    let (leader, _) = leaders.next()?;
    if leaders.next().is_some() {
        return None;
    }
    Some(*leader)
}

/// Tallies are meaningless before voting starts and for proposals that
/// never reached a valid vote
pub(crate) fn tally_visible(status: Option<&str>) -> bool {
    !matches!(
        status,
        Some(STATUS_DEPOSIT_PERIOD) | Some(STATUS_FAILED) | Some(STATUS_INVALID)
    )
}

/// Fraction of the signing window the validator did not miss, `0.0..=1.0`
pub(crate) fn uptime(missed_blocks: Option<i64>, signed_blocks_window: i64) -> Option<f64> {
    let missed = missed_blocks?;
    if signed_blocks_window <= 0 {
        return None;
    }
    Some((1.0 - missed as f64 / signed_blocks_window as f64).clamp(0.0, 1.0))
}

/// Stored status strings matched by a status group
pub(crate) fn statuses_for(filter: ProposalStatusFilter) -> Vec<String> {
    let statuses: &[&str] = match filter {
        ProposalStatusFilter::Voting => &[STATUS_VOTING_PERIOD],
        ProposalStatusFilter::Depositing => &[STATUS_DEPOSIT_PERIOD],
        ProposalStatusFilter::Passed => &[STATUS_PASSED],
        ProposalStatusFilter::Rejected => &[STATUS_REJECTED],
        ProposalStatusFilter::Failed => &[STATUS_FAILED],
    };
    statuses.iter().map(|s| s.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn tally(yes: i64, no: i64, no_with_veto: i64, abstain: i64) -> ProposalTallyResult {
        ProposalTallyResult {
            proposal_id: 1,
            yes: Decimal::from(yes),
            no: Decimal::from(no),
            no_with_veto: Decimal::from(no_with_veto),
            abstain: Decimal::from(abstain),
            height: 100,
        }
    }

    #[test]
    fn test_outstanding_option_picks_strict_maximum() {
        assert_eq!(outstanding_option(&tally(10, 3, 0, 1)), Some(VoteOption::Yes));
        assert_eq!(outstanding_option(&tally(1, 3, 0, 1)), Some(VoteOption::No));
        assert_eq!(outstanding_option(&tally(1, 3, 7, 1)), Some(VoteOption::NoWithVeto));
        assert_eq!(outstanding_option(&tally(1, 3, 0, 9)), Some(VoteOption::Abstain));
    }

    #[test]
    fn test_outstanding_option_tie_is_none() {
        assert_eq!(outstanding_option(&tally(5, 5, 0, 1)), None);
        assert_eq!(outstanding_option(&tally(0, 2, 0, 2)), None);
    }

    #[test]
    fn test_outstanding_option_no_votes_is_none() {
        assert_eq!(outstanding_option(&tally(0, 0, 0, 0)), None);
    }

    #[test]
    fn test_tally_hidden_for_deposit_failed_and_invalid() {
        assert!(!tally_visible(Some(STATUS_DEPOSIT_PERIOD)));
        assert!(!tally_visible(Some(STATUS_FAILED)));
        assert!(!tally_visible(Some(STATUS_INVALID)));
        assert!(tally_visible(Some(STATUS_VOTING_PERIOD)));
        assert!(tally_visible(Some(STATUS_PASSED)));
        assert!(tally_visible(None));
    }

    #[test]
    fn test_uptime_is_clamped() {
        assert_eq!(uptime(Some(100), 10_000), Some(0.99));
        assert_eq!(uptime(Some(0), 10_000), Some(1.0));
        assert_eq!(uptime(Some(20_000), 10_000), Some(0.0));
        assert_eq!(uptime(None, 10_000), None);
        assert_eq!(uptime(Some(5), 0), None);
    }

    #[test]
    fn test_status_groups() {
        assert_eq!(
            statuses_for(ProposalStatusFilter::Voting),
            vec![STATUS_VOTING_PERIOD.to_string()]
        );
        assert_eq!(
            statuses_for(ProposalStatusFilter::Depositing),
            vec![STATUS_DEPOSIT_PERIOD.to_string()]
        );
    }
}
