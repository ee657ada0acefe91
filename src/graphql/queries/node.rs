use super::prelude::*;

#[derive(Default)]
pub struct NodeQueries;

#[Object]
impl NodeQueries {
    /// Fetch any entity by its global identifier; null if it does not exist
    async fn node(&self, ctx: &Context<'_>, id: GlobalId) -> Result<Option<Node>> {
        loaders(ctx)?.nodes.load_optional(&id).await.gql()
    }

    /// Fetch several entities at once, in the order given. Identifiers of
    /// the same type are loaded in one batch.
    async fn nodes(&self, ctx: &Context<'_>, ids: Vec<GlobalId>) -> Result<Vec<Option<Node>>> {
        let results = loaders(ctx)?.nodes.load_many(&ids).await;
        results
            .into_iter()
            .collect::<std::result::Result<Vec<_>, ExplorerError>>()
            .gql()
    }
}
