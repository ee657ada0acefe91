use async_graphql::ErrorExtensions;

use super::prelude::*;

#[derive(Default)]
pub struct ProposalQueries;

#[Object]
impl ProposalQueries {
    /// Proposals, newest first
    async fn proposals(
        &self,
        ctx: &Context<'_>,
        input: QueryProposalsInput,
    ) -> Result<ProposalConnection> {
        let request = page_request(ctx, input.first, input.after)?;

        let related_address = input.related_address.filter(|a| !a.trim().is_empty());
        let filter = match (related_address, input.filter) {
            (Some(address), _) => ProposalFilter {
                statuses: None,
                related_address: Some(address),
            },
            (None, Some(group)) => ProposalFilter {
                statuses: Some(statuses_for(group)),
                related_address: None,
            },
            (None, None) => ProposalFilter::default(),
        };

        tracing::debug!(
            first = request.first(),
            after = request.after(),
            filter = ?filter,
            "Listing proposals"
        );

        let db = ctx.data::<Database>()?;
        let conn = Connection::page(&db.proposals(), &filter, request)
            .await
            .gql()?;
        Ok(ProposalConnection::from_connection(conn))
    }

    /// A single proposal by global identifier
    #[graphql(name = "proposalByID")]
    async fn proposal_by_id(&self, ctx: &Context<'_>, id: GlobalId) -> Result<Option<Proposal>> {
        if id.entity_type() != Proposal::TYPE_TAG {
            return Err(ExplorerError::invalid_argument(
                "id",
                format!("expected a proposal identifier, got \"{}\"", id.entity_type()),
            )
            .extend());
        }
        match loaders(ctx)?.nodes.load_optional(&id).await.gql()? {
            Some(Node::Proposal(proposal)) => Ok(Some(proposal)),
            _ => Ok(None),
        }
    }
}
