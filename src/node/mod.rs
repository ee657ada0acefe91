//! Global object identity and polymorphic resolution
//!
//! Every entity exposed through the query graph implements [`NodeEntity`]
//! and is registered in the [`EntityRegistry`] at startup. A [`GlobalId`]
//! carries the entity's tag and natural key; the registry maps the tag back
//! to the batch fetch for that entity type.

mod global_id;
mod registry;

use std::any::Any;

use async_graphql::Union;

use crate::db::{Block, Database, Proposal, Reaction, Validator};
use crate::error::Result;
use crate::loader::{BlockFetch, ProposalFetch, ReactionFetch, ValidatorFetch};

pub use global_id::GlobalId;
pub use registry::{EntityRegistry, RegistryEntry};

/// Capability implemented by every type reachable through a [`GlobalId`].
pub trait NodeEntity: Any + Clone + Send + Sync {
    /// Registry tag, `[a-z0-9_]+`
    const TYPE_TAG: &'static str;

    /// Natural key, stable for the entity's identity within one data version
    fn natural_key(&self) -> String;

    fn into_node(self) -> Node;
}

/// Any entity that can be fetched by global identifier.
#[derive(Union, Clone, Debug)]
pub enum Node {
    Block(Block),
    Proposal(Proposal),
    Validator(Validator),
    Reaction(Reaction),
}

impl Node {
    /// Tags that must be registered before the server accepts requests
    pub const TAGS: &'static [&'static str] = &[
        Block::TYPE_TAG,
        Proposal::TYPE_TAG,
        Validator::TYPE_TAG,
        Reaction::TYPE_TAG,
    ];

    /// The wrapped entity and its Rust type name
    pub(crate) fn as_any(&self) -> (&dyn Any, &'static str) {
        match self {
            Node::Block(b) => (b as &dyn Any, std::any::type_name::<Block>()),
            Node::Proposal(p) => (p as &dyn Any, std::any::type_name::<Proposal>()),
            Node::Validator(v) => (v as &dyn Any, std::any::type_name::<Validator>()),
            Node::Reaction(r) => (r as &dyn Any, std::any::type_name::<Reaction>()),
        }
    }
}

impl NodeEntity for Block {
    const TYPE_TAG: &'static str = "block";

    fn natural_key(&self) -> String {
        self.hash.clone()
    }

    fn into_node(self) -> Node {
        Node::Block(self)
    }
}

impl NodeEntity for Proposal {
    const TYPE_TAG: &'static str = "proposal";

    fn natural_key(&self) -> String {
        self.id.to_string()
    }

    fn into_node(self) -> Node {
        Node::Proposal(self)
    }
}

impl NodeEntity for Validator {
    const TYPE_TAG: &'static str = "validator";

    fn natural_key(&self) -> String {
        self.consensus_address.clone()
    }

    fn into_node(self) -> Node {
        Node::Validator(self)
    }
}

impl NodeEntity for Reaction {
    const TYPE_TAG: &'static str = "reaction";

    fn natural_key(&self) -> String {
        self.id.clone()
    }

    fn into_node(self) -> Node {
        Node::Reaction(self)
    }
}

/// Build the registry backed by the database and check that every node
/// type is covered.
pub fn build_registry(db: &Database) -> Result<EntityRegistry> {
    let mut registry = EntityRegistry::new();
    registry
        .register::<Block, _>(BlockFetch::new(db.clone()))?
        .register::<Proposal, _>(ProposalFetch::new(db.clone()))?
        .register::<Validator, _>(ValidatorFetch::new(db.clone()))?
        .register::<Reaction, _>(ReactionFetch::new(db.clone()))?;
    registry.ensure_complete(Node::TAGS)?;
    Ok(registry)
}
