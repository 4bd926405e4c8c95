pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use memory::MemoryVectorStore;
pub use postgres::{create_pool, PgVectorStore};
pub use redis::{create_redis_client, Cache, CacheKey, CacheWriterHandle};
pub use store::{DuplicatePolicy, PutReport, SchemaState, StoredMatch, VectorStore};
