pub mod blocks;
pub mod node;
pub mod proposals;
pub mod validators;

pub use blocks::BlockQueries;
pub use node::NodeQueries;
pub use proposals::ProposalQueries;
pub use validators::ValidatorQueries;

pub(crate) mod prelude {
    pub(crate) use async_graphql::{Context, Object, Result};

    pub(crate) use crate::db::{Database, Proposal, ProposalFilter, Validator, ValidatorFilter};
    pub(crate) use crate::error::ExplorerError;
    pub(crate) use crate::graphql::helpers::*;
    pub(crate) use crate::graphql::pagination::Connection;
    pub(crate) use crate::graphql::types::*;
    pub(crate) use crate::node::{GlobalId, Node, NodeEntity};
}
