//! Entity registry: type tag -> key extractor + batch fetch
//!
//! Replaces a closed runtime type switch with a lookup table that is filled
//! once at startup. Looking up an unregistered tag or Rust type yields
//! [`ExplorerError::UnknownEntity`] instead of aborting the request.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;

use super::{GlobalId, Node, NodeEntity};
use crate::error::{ExplorerError, Result};
use crate::loader::BatchFetch;

use super::global_id::is_valid_tag;

type KeyOf = Box<dyn Fn(&dyn Any) -> Option<String> + Send + Sync>;

/// One registered entity type.
pub struct RegistryEntry {
    tag: &'static str,
    type_name: &'static str,
    key_of: KeyOf,
    fetch: Arc<dyn BatchFetch<Value = Node>>,
}

impl RegistryEntry {
    pub fn tag(&self) -> &'static str {
        self.tag
    }

    /// The tag's batch fetch, with values wrapped as [`Node`]
    pub fn fetch(&self) -> Arc<dyn BatchFetch<Value = Node>> {
        Arc::clone(&self.fetch)
    }

    /// Natural key of `entity`, or `None` if it is not this entry's type
    pub fn key_of(&self, entity: &dyn Any) -> Option<String> {
        (self.key_of)(entity)
    }
}

impl std::fmt::Debug for RegistryEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryEntry")
            .field("tag", &self.tag)
            .field("type_name", &self.type_name)
            .field("fetch", &self.fetch.name())
            .finish()
    }
}

/// Wraps a typed fetch so the registry can hand out `Node` values.
struct NodeFetch<F: BatchFetch> {
    inner: F,
    wrap: fn(F::Value) -> Node,
}

#[async_trait]
impl<F: BatchFetch> BatchFetch for NodeFetch<F> {
    type Value = Node;

    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn fetch(&self, keys: &[String]) -> anyhow::Result<HashMap<String, Node>> {
        let found = self.inner.fetch(keys).await?;
        Ok(found
            .into_iter()
            .map(|(key, value)| (key, (self.wrap)(value)))
            .collect())
    }
}

/// Registry of every entity type reachable through a [`GlobalId`].
///
/// Mutated only while the application starts; share it as
/// `Arc<EntityRegistry>` afterwards.
#[derive(Default, Debug)]
pub struct EntityRegistry {
    entries: BTreeMap<&'static str, RegistryEntry>,
    by_type: HashMap<TypeId, &'static str>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a [`NodeEntity`] type with its batch fetch
    pub fn register<T, F>(&mut self, fetch: F) -> Result<&mut Self>
    where
        T: NodeEntity,
        F: BatchFetch<Value = T>,
    {
        self.register_with(T::TYPE_TAG, T::natural_key, T::into_node, fetch)
    }

    /// Register an entity type with an explicit tag, key extractor and
    /// `Node` constructor.
    pub fn register_with<T, F>(
        &mut self,
        tag: &'static str,
        key_of: fn(&T) -> String,
        wrap: fn(T) -> Node,
        fetch: F,
    ) -> Result<&mut Self>
    where
        T: Any + Clone + Send + Sync,
        F: BatchFetch<Value = T>,
    {
        if !is_valid_tag(tag) {
            return Err(ExplorerError::Configuration(format!(
                "invalid entity tag \"{}\" (expected [a-z0-9_]+)",
                tag
            )));
        }
        if self.entries.contains_key(tag) {
            return Err(ExplorerError::Configuration(format!(
                "entity tag \"{}\" is already registered",
                tag
            )));
        }
        let type_id = TypeId::of::<T>();
        if let Some(existing) = self.by_type.get(&type_id) {
            return Err(ExplorerError::Configuration(format!(
                "{} is already registered as \"{}\"",
                std::any::type_name::<T>(),
                existing
            )));
        }

        tracing::debug!(
            tag,
            entity = std::any::type_name::<T>(),
            "Registering entity type"
        );

        let entry = RegistryEntry {
            tag,
            type_name: std::any::type_name::<T>(),
            key_of: Box::new(move |entity: &dyn Any| entity.downcast_ref::<T>().map(key_of)),
            fetch: Arc::new(NodeFetch { inner: fetch, wrap }),
        };
        self.entries.insert(tag, entry);
        self.by_type.insert(type_id, tag);
        Ok(self)
    }

    /// Fail with a configuration error naming every missing tag
    pub fn ensure_complete(&self, required: &[&str]) -> Result<()> {
        let missing: Vec<&str> = required
            .iter()
            .copied()
            .filter(|tag| !self.entries.contains_key(tag))
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(ExplorerError::Configuration(format!(
                "no registration for entity tag(s): {}",
                missing.join(", ")
            )))
        }
    }

    pub fn resolve(&self, tag: &str) -> Result<&RegistryEntry> {
        self.entries
            .get(tag)
            .ok_or_else(|| ExplorerError::unknown_entity(tag))
    }

    pub fn tags(&self) -> Vec<&'static str> {
        self.entries.keys().copied().collect()
    }

    /// Build the global identifier for any registered entity value
    pub fn encode<T: Any>(&self, entity: &T) -> Result<GlobalId> {
        self.encode_dyn(entity, std::any::type_name::<T>())
    }

    /// Build the global identifier for whichever variant `node` holds
    pub fn encode_node(&self, node: &Node) -> Result<GlobalId> {
        let (entity, type_name) = node.as_any();
        self.encode_dyn(entity, type_name)
    }

    fn encode_dyn(&self, entity: &dyn Any, type_name: &str) -> Result<GlobalId> {
        let tag = self
            .by_type
            .get(&Any::type_id(entity))
            .ok_or_else(|| ExplorerError::unknown_entity(type_name))?;
        let entry = self.resolve(tag)?;
        let key = entry
            .key_of(entity)
            .ok_or_else(|| ExplorerError::unknown_entity(type_name))?;
        Ok(GlobalId::new(entry.tag, key))
    }
}
