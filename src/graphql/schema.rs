//! GraphQL schema definition
//!
//! Schema-wide data is read-only: the entity registry, the database handle,
//! configuration and page limits. Loaders are per request and are attached
//! by the HTTP handler, never here.

use std::sync::Arc;

use async_graphql::{EmptyMutation, EmptySubscription, MergedObject, Schema};

use crate::config::Config;
use crate::db::Database;
use crate::node::EntityRegistry;

use super::queries::{BlockQueries, NodeQueries, ProposalQueries, ValidatorQueries};

/// The GraphQL schema type
pub type ExplorerSchema = Schema<QueryRoot, EmptyMutation, EmptySubscription>;

#[derive(MergedObject, Default)]
pub struct QueryRoot(NodeQueries, ProposalQueries, ValidatorQueries, BlockQueries);

/// Build the GraphQL schema with all resolvers
pub fn build_schema(
    registry: Arc<EntityRegistry>,
    db: Database,
    config: &Config,
) -> ExplorerSchema {
    Schema::build(QueryRoot::default(), EmptyMutation, EmptySubscription)
        .data(registry)
        .data(db)
        .data(config.page_limits())
        .data(config.clone())
        .finish()
}
