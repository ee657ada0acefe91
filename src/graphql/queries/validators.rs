use super::prelude::*;

#[derive(Default)]
pub struct ValidatorQueries;

#[Object]
impl ValidatorQueries {
    /// Validators, highest voting power first
    async fn validators(
        &self,
        ctx: &Context<'_>,
        input: Option<QueryValidatorsInput>,
    ) -> Result<ValidatorConnection> {
        let input = input.unwrap_or_default();
        let request = page_request(ctx, input.first, input.after)?;
        let filter = ValidatorFilter {
            status: input.filter.unwrap_or_default().into(),
        };

        let db = ctx.data::<Database>()?;
        let conn = Connection::page(&db.validators(), &filter, request)
            .await
            .gql()?;
        Ok(ValidatorConnection::from_connection(conn))
    }

    /// Look a validator up by consensus, operator or self-delegation address
    async fn validator_by_address(
        &self,
        ctx: &Context<'_>,
        address: String,
    ) -> Result<Option<Validator>> {
        let db = ctx.data::<Database>()?;
        db.validators()
            .find_by_address(address.trim())
            .await
            .map_err(|e| {
                tracing::error!(address = %address, error = %e, "Validator lookup failed");
                ExplorerError::batch_fetch(Validator::TYPE_TAG, e)
            })
            .gql()
    }
}
