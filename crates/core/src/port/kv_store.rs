// Ordered Key-Value Store Port (Interface)

use crate::error::Result;
use async_trait::async_trait;

/// Independently ordered key space within one physical store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Namespace {
    /// job key -> record
    Jobs,
    /// job key -> state code
    JobStates,
    /// type ++ job key -> empty
    Activatable,
    /// deadline ++ job key -> empty
    Deadlines,
}

impl Namespace {
    pub const ALL: [Namespace; 4] = [
        Namespace::Jobs,
        Namespace::JobStates,
        Namespace::Activatable,
        Namespace::Deadlines,
    ];

    /// Stable numeric id used by persistent substrates
    pub fn id(self) -> i64 {
        match self {
            Namespace::Jobs => 1,
            Namespace::JobStates => 2,
            Namespace::Activatable => 3,
            Namespace::Deadlines => 4,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Namespace::Jobs => "jobs",
            Namespace::JobStates => "job_states",
            Namespace::Activatable => "activatable",
            Namespace::Deadlines => "deadlines",
        }
    }
}

impl std::fmt::Display for Namespace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Key/value pair returned by a scan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    pub key: Vec<u8>,
    pub value: Vec<u8>,
}

/// Single write inside a batch
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    Put {
        ns: Namespace,
        key: Vec<u8>,
        value: Vec<u8>,
    },
    Delete {
        ns: Namespace,
        key: Vec<u8>,
    },
}

/// Ordered set of writes committed as one unit
///
/// Ops are applied in insertion order, so a delete followed by a put of the
/// same key leaves the key present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WriteBatch {
    ops: Vec<BatchOp>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, ns: Namespace, key: impl Into<Vec<u8>>, value: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Put {
            ns,
            key: key.into(),
            value: value.into(),
        });
    }

    pub fn delete(&mut self, ns: Namespace, key: impl Into<Vec<u8>>) {
        self.ops.push(BatchOp::Delete {
            ns,
            key: key.into(),
        });
    }

    pub fn ops(&self) -> &[BatchOp] {
        &self.ops
    }

    pub fn len(&self) -> usize {
        self.ops.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }
}

/// Ordered, transactional key-value substrate
///
/// Keys compare as unsigned byte strings. Implementations must make `write`
/// all-or-nothing, including across a crash.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a single value
    async fn get(&self, ns: Namespace, key: &[u8]) -> Result<Option<Vec<u8>>>;

    /// Membership check
    async fn exists(&self, ns: Namespace, key: &[u8]) -> Result<bool> {
        Ok(self.get(ns, key).await?.is_some())
    }

    /// Single-key write outside any batch
    async fn put(&self, ns: Namespace, key: &[u8], value: &[u8]) -> Result<()>;

    /// Single-key delete outside any batch
    async fn delete(&self, ns: Namespace, key: &[u8]) -> Result<()>;

    /// Apply every op of `batch` atomically
    async fn write(&self, batch: WriteBatch) -> Result<()>;

    /// Up to `limit` entries with key >= `from`, in ascending key order
    async fn scan(&self, ns: Namespace, from: &[u8], limit: usize) -> Result<Vec<KvEntry>>;
}
