//! Per-request loader bundle
//!
//! Built fresh for every GraphQL request and attached with
//! `Request::data`, so caches never outlive the request that filled them.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use super::{
    BatchLoader, DepositTotalFetch, ExpectedReturnFetch, ParticipationFetch,
    ReactionsByTargetFetch, RelativeProposalCountFetch, TallyFetch, ValidatorByAccountFetch,
};
use crate::config::Config;
use crate::db::Database;
use crate::error::{ExplorerError, Result};
use crate::node::{EntityRegistry, GlobalId, Node};

type NodeBatchLoader = BatchLoader<NodeFetch>;

/// Concrete wrapper over the registry's type-erased fetch. Keeps the
/// trait object out of the loader's generic parameter, which otherwise
/// trips rustc's `Send` check on resolver futures (erased `dyn` lifetime).
struct NodeFetch(Arc<dyn super::BatchFetch<Value = Node>>);

#[async_trait::async_trait]
impl super::BatchFetch for NodeFetch {
    type Value = Node;

    fn name(&self) -> &str {
        self.0.name()
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Node>> {
        self.0.fetch(keys).await
    }
}

/// Resolves global identifiers through the registry, one batch loader per
/// entity tag. Loaders are created lazily on first use of a tag.
pub struct NodeLoader {
    registry: Arc<EntityRegistry>,
    delay: Duration,
    loaders: Mutex<HashMap<&'static str, NodeBatchLoader>>,
}

impl NodeLoader {
    pub fn new(registry: Arc<EntityRegistry>, delay: Duration) -> Self {
        Self {
            registry,
            delay,
            loaders: Mutex::new(HashMap::new()),
        }
    }

    fn loader_for(&self, tag: &str) -> Result<NodeBatchLoader> {
        let entry = self.registry.resolve(tag)?;
        let mut loaders = self.loaders.lock();
        let loader = loaders
            .entry(entry.tag())
            .or_insert_with(|| BatchLoader::with_delay(NodeFetch(entry.fetch()), self.delay));
        Ok(loader.clone())
    }

    /// Load the entity behind `id`, or `None` if the store has no such key
    pub async fn load_optional(&self, id: &GlobalId) -> Result<Option<Node>> {
        let loader = self.loader_for(id.entity_type())?;
        loader.load(id.id()).await
    }

    /// Load the entity behind `id`; a missing key is [`ExplorerError::NotFound`]
    pub async fn load(&self, id: &GlobalId) -> Result<Node> {
        self.load_optional(id)
            .await?
            .ok_or_else(|| ExplorerError::not_found(id.entity_type(), id.id()))
    }

    /// Load several identifiers concurrently so that ids of the same tag
    /// share one batch. Per-id failures stay per id.
    pub async fn load_many(&self, ids: &[GlobalId]) -> Vec<Result<Option<Node>>> {
        futures::future::join_all(ids.iter().map(|id| self.load_optional(id))).await
    }
}

/// All loaders used while resolving one GraphQL request
pub struct RequestLoaders {
    pub nodes: NodeLoader,
    pub tallies: BatchLoader<TallyFetch>,
    pub deposit_totals: BatchLoader<DepositTotalFetch>,
    pub reactions: BatchLoader<ReactionsByTargetFetch>,
    pub participation: BatchLoader<ParticipationFetch>,
    pub relative_proposal_counts: BatchLoader<RelativeProposalCountFetch>,
    pub expected_returns: BatchLoader<ExpectedReturnFetch>,
    /// Validators keyed by self-delegate account, for voters and depositors
    pub validator_accounts: BatchLoader<ValidatorByAccountFetch>,
}

impl RequestLoaders {
    pub fn new(registry: Arc<EntityRegistry>, db: &Database, config: &Config) -> Self {
        let delay = config.loader_batch_delay;
        Self {
            nodes: NodeLoader::new(registry, delay),
            tallies: BatchLoader::with_delay(TallyFetch::new(db.clone()), delay),
            deposit_totals: BatchLoader::with_delay(
                DepositTotalFetch::new(db.clone(), config.chain_coin_denom.clone()),
                delay,
            ),
            reactions: BatchLoader::with_delay(ReactionsByTargetFetch::new(db.clone()), delay),
            participation: BatchLoader::with_delay(ParticipationFetch::new(db.clone()), delay),
            relative_proposal_counts: BatchLoader::with_delay(
                RelativeProposalCountFetch::new(db.clone()),
                delay,
            ),
            expected_returns: BatchLoader::with_delay(
                ExpectedReturnFetch::new(db.clone(), config.chain_coin_denom.clone()),
                delay,
            ),
            validator_accounts: BatchLoader::with_delay(
                ValidatorByAccountFetch::new(db.clone()),
                delay,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Block, Proposal};
    use crate::node::test_support::{MemoryFetch, sample_block, sample_proposal};
    use assert_matches::assert_matches;

    fn registry() -> Arc<EntityRegistry> {
        let mut registry = EntityRegistry::new();
        registry
            .register::<Block, _>(MemoryFetch::new(
                "block",
                vec![sample_block(1), sample_block(2)],
                |b: &Block| b.hash.clone(),
            ))
            .unwrap()
            .register::<Proposal, _>(MemoryFetch::new(
                "proposal",
                vec![sample_proposal(42)],
                |p: &Proposal| p.id.to_string(),
            ))
            .unwrap();
        Arc::new(registry)
    }

    #[tokio::test]
    async fn test_load_resolves_through_registry() {
        let registry = registry();
        let loader = NodeLoader::new(registry.clone(), Duration::ZERO);
        let node = loader.load(&GlobalId::new("proposal", "42")).await.unwrap();
        assert_matches!(&node, Node::Proposal(p) if p.id == 42);
        assert_eq!(registry.encode_node(&node).unwrap(), GlobalId::new("proposal", "42"));
    }

    #[tokio::test]
    async fn test_missing_key_is_not_found() {
        let loader = NodeLoader::new(registry(), Duration::ZERO);
        let id = GlobalId::new("proposal", "999");
        assert_matches!(loader.load_optional(&id).await, Ok(None));
        assert_matches!(
            loader.load(&id).await,
            Err(ExplorerError::NotFound { entity_type, key }) if entity_type == "proposal" && key == "999"
        );
    }

    #[tokio::test]
    async fn test_unregistered_tag_is_unknown_entity() {
        let loader = NodeLoader::new(registry(), Duration::ZERO);
        assert_matches!(
            loader.load(&GlobalId::new("validator", "x")).await,
            Err(ExplorerError::UnknownEntity { .. })
        );
    }

    #[tokio::test]
    async fn test_load_many_keeps_per_id_outcomes() {
        let loader = NodeLoader::new(registry(), Duration::ZERO);
        let block = sample_block(2);
        let ids = vec![
            GlobalId::new("block", block.hash.clone()),
            GlobalId::new("proposal", "7"),
            GlobalId::new("nope", "1"),
            GlobalId::new("proposal", "42"),
        ];
        let results = loader.load_many(&ids).await;
        assert_matches!(&results[0], Ok(Some(Node::Block(b))) if b.height == 2);
        assert_matches!(&results[1], Ok(None));
        assert_matches!(&results[2], Err(ExplorerError::UnknownEntity { .. }));
        assert_matches!(&results[3], Ok(Some(Node::Proposal(_))));
    }
}
