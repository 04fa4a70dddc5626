// In-memory KeyValueStore (tests and non-durable embedders)

use crate::error::{AppError, Result};
use crate::port::kv_store::{BatchOp, KeyValueStore, KvEntry, Namespace, WriteBatch};
use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

type Tree = BTreeMap<Vec<u8>, Vec<u8>>;

/// One `BTreeMap` per namespace behind a single lock
///
/// A batch takes the write lock once, so readers never observe a partial batch.
#[derive(Default)]
pub struct InMemoryKvStore {
    trees: RwLock<HashMap<Namespace, Tree>>,
}

impl InMemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of entries in `ns`
    pub fn len(&self, ns: Namespace) -> Result<usize> {
        Ok(self.read()?.get(&ns).map_or(0, |tree| tree.len()))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<Namespace, Tree>>> {
        self.trees
            .read()
            .map_err(|_| AppError::Internal("in-memory store lock poisoned".to_string()))
    }

    fn write_lock(&self) -> Result<RwLockWriteGuard<'_, HashMap<Namespace, Tree>>> {
        self.trees
            .write()
            .map_err(|_| AppError::Internal("in-memory store lock poisoned".to_string()))
    }
}

#[async_trait]
impl KeyValueStore for InMemoryKvStore {
    async fn get(&self, ns: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>> {
        Ok(self.read()?.get(&ns).and_then(|tree| tree.get(key).cloned()))
    }

    async fn put(&self, ns: Namespace, key: &[u8], value: &[u8]) -> Result<()> {
        self.write_lock()?
            .entry(ns)
            .or_default()
            .insert(key.to_vec(), value.to_vec());
        Ok(())
    }

    async fn delete(&self, ns: Namespace, key: &[u8]) -> Result<()> {
        if let Some(tree) = self.write_lock()?.get_mut(&ns) {
            tree.remove(key);
        }
        Ok(())
    }

    async fn write(&self, batch: WriteBatch) -> Result<()> {
        let mut trees = self.write_lock()?;
        for op in batch.ops() {
            match op {
                BatchOp::Put { ns, key, value } => {
                    trees.entry(*ns).or_default().insert(key.clone(), value.clone());
                }
                BatchOp::Delete { ns, key } => {
                    if let Some(tree) = trees.get_mut(ns) {
                        tree.remove(key);
                    }
                }
            }
        }
        Ok(())
    }

    async fn scan(&self, ns: Namespace, from: &[u8], limit: usize) -> Result<Vec<KvEntry>> {
        let trees = self.read()?;
        let Some(tree) = trees.get(&ns) else {
            return Ok(Vec::new());
        };

        Ok(tree
            .range::<[u8], _>((Bound::Included(from), Bound::Unbounded))
            .take(limit)
            .map(|(key, value)| KvEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }
}
