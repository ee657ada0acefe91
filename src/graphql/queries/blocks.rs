use super::prelude::*;

#[derive(Default)]
pub struct BlockQueries;

#[Object]
impl BlockQueries {
    /// Blocks, newest first
    async fn blocks(
        &self,
        ctx: &Context<'_>,
        first: Option<i32>,
        after: Option<i32>,
    ) -> Result<BlockConnection> {
        let request = page_request(ctx, first, after)?;
        let db = ctx.data::<Database>()?;
        let conn = Connection::page(&db.blocks(), &(), request).await.gql()?;
        Ok(BlockConnection::from_connection(conn))
    }
}
