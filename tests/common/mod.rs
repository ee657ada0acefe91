//! Shared fixtures for integration tests
//!
//! Entities come from in-memory fetches; the database handle is a lazy pool
//! that never connects unless a test asks it to.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{NaiveDate, NaiveDateTime};
use sqlx::postgres::PgPoolOptions;

use likedao_api::config::Config;
use likedao_api::db::{Block, Database, Proposal, Reaction, Validator};
use likedao_api::loader::{BatchFetch, RequestLoaders};
use likedao_api::node::EntityRegistry;

/// Fetch over a fixed set of entities that counts its calls
pub struct MemoryFetch<T> {
    name: &'static str,
    items: HashMap<String, T>,
    calls: Arc<AtomicUsize>,
}

impl<T> MemoryFetch<T> {
    pub fn new(name: &'static str, items: Vec<T>, key: fn(&T) -> String) -> Self {
        Self {
            name,
            items: items.into_iter().map(|item| (key(&item), item)).collect(),
            calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    pub fn calls(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.calls)
    }
}

#[async_trait]
impl<T: Clone + Send + Sync + 'static> BatchFetch for MemoryFetch<T> {
    type Value = T;

    fn name(&self) -> &str {
        self.name
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, T>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(keys
            .iter()
            .filter_map(|k| self.items.get(k).map(|v| (k.clone(), v.clone())))
            .collect())
    }
}

/// A fetch whose backing store is down
pub struct FailingFetch;

#[async_trait]
impl BatchFetch for FailingFetch {
    type Value = Reaction;

    fn name(&self) -> &str {
        "reaction"
    }

    async fn fetch(&self, _keys: &[String]) -> anyhow::Result<HashMap<String, Reaction>> {
        anyhow::bail!("connection refused")
    }
}

pub fn at(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2022, 6, day)
        .and_then(|d| d.and_hms_opt(8, 30, 0))
        .unwrap()
}

pub fn block(height: i64) -> Block {
    Block {
        height,
        hash: format!("{:064X}", height),
        num_txs: Some(1),
        total_gas: Some(80_000),
        proposer_address: None,
        timestamp: at(1),
    }
}

pub fn proposal(id: i32, title: &str) -> Proposal {
    Proposal {
        id,
        title: title.to_string(),
        description: "Community pool spend for the explorer".to_string(),
        proposal_route: "gov".to_string(),
        proposal_type: "CommunityPoolSpendProposal".to_string(),
        submit_time: at(2),
        deposit_end_time: Some(at(9)),
        voting_start_time: Some(at(9)),
        voting_end_time: Some(at(23)),
        proposer_address: "like1proposer".to_string(),
        status: Some("PROPOSAL_STATUS_PASSED".to_string()),
    }
}

pub fn validator(address: &str, moniker: &str) -> Validator {
    Validator {
        consensus_address: address.to_string(),
        consensus_pubkey: format!("pub-{}", address),
        operator_address: Some(format!("likevaloper-{}", address)),
        self_delegate_address: Some(format!("like-{}", address)),
        moniker: Some(moniker.to_string()),
        identity: None,
        avatar_url: None,
        website: None,
        security_contact: None,
        details: None,
        status: Some(3),
        jailed: Some(false),
        tombstoned: Some(false),
        voting_power: None,
        relative_voting_power: Some(0.5),
        commission: None,
        min_self_delegation: None,
        start_height: Some(1),
        missed_blocks_counter: Some(5_000),
        jailed_until: None,
    }
}

/// Database handle that fails fast if anything tries to use it
pub fn lazy_database() -> Database {
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(250))
        .connect_lazy("postgres://likedao@127.0.0.1:1/likedao")
        .expect("lazy pool");
    Database::new(pool)
}

pub fn config() -> Config {
    Config::with_database_url("postgres://likedao@127.0.0.1:1/likedao")
}

/// Call counters for each in-memory fetch
pub struct Calls {
    pub blocks: Arc<AtomicUsize>,
    pub proposals: Arc<AtomicUsize>,
    pub validators: Arc<AtomicUsize>,
}

/// Registry over in-memory data: blocks 1-3, proposals 1-2, two validators
/// and a reaction store that always fails
pub fn registry() -> (EntityRegistry, Calls) {
    let blocks = MemoryFetch::new("block", (1..=3).map(block).collect(), |b: &Block| {
        b.hash.clone()
    });
    let proposals = MemoryFetch::new(
        "proposal",
        vec![proposal(1, "Fund the explorer"), proposal(2, "Raise deposit")],
        |p: &Proposal| p.id.to_string(),
    );
    let validators = MemoryFetch::new(
        "validator",
        vec![validator("likevalcons1a", "alpha"), validator("likevalcons1b", "beta")],
        |v: &Validator| v.consensus_address.clone(),
    );
    let calls = Calls {
        blocks: blocks.calls(),
        proposals: proposals.calls(),
        validators: validators.calls(),
    };

    let mut registry = EntityRegistry::new();
    registry
        .register::<Block, _>(blocks)
        .and_then(|r| r.register::<Proposal, _>(proposals))
        .and_then(|r| r.register::<Validator, _>(validators))
        .and_then(|r| r.register::<Reaction, _>(FailingFetch))
        .expect("registry");
    (registry, calls)
}

pub fn request_loaders(
    registry: Arc<EntityRegistry>,
    db: &Database,
    config: &Config,
) -> RequestLoaders {
    RequestLoaders::new(registry, db, config)
}
