// Port Layer - Interfaces for external dependencies

pub mod kv_store;
pub mod memory_kv;
pub mod record_codec;

// Re-exports
pub use kv_store::{BatchOp, KeyValueStore, KvEntry, Namespace, WriteBatch};
pub use memory_kv::InMemoryKvStore;
pub use record_codec::{JsonRecordCodec, RecordCodec};
