//! GraphQL API
//!
//! Queries only. Each domain area lives in `queries/` as its own
//! `#[Object]` struct and is merged into [`QueryRoot`] in `schema.rs`.
//! Every entity reachable by global identifier is a member of the `Node`
//! union and exposes an `id: NodeID!` field.

pub mod helpers;
pub mod pagination;
pub mod queries;
mod schema;
pub mod types;

pub use schema::{ExplorerSchema, QueryRoot, build_schema};
