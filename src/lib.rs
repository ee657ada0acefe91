//! LikeDAO API - GraphQL data API for the governance explorer
//!
//! Serves proposals, validators, blocks and reactions indexed from the
//! chain. Every entity has an opaque global identifier resolvable through
//! the `node` query, related data is batch loaded per request, and list
//! queries are cursor paginated.

pub mod api;
pub mod config;
pub mod db;
pub mod error;
pub mod graphql;
pub mod loader;
pub mod node;

use std::sync::Arc;

use crate::config::Config;
use crate::db::Database;
use crate::graphql::ExplorerSchema;
use crate::node::EntityRegistry;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub db: Database,
    pub schema: ExplorerSchema,
    pub registry: Arc<EntityRegistry>,
}

impl AppState {
    /// Wire the schema to a registry and database
    pub fn new(config: Config, db: Database, registry: EntityRegistry) -> Self {
        let registry = Arc::new(registry);
        let schema = graphql::build_schema(registry.clone(), db.clone(), &config);
        Self {
            config: Arc::new(config),
            db,
            schema,
            registry,
        }
    }
}
