//! Slotwatch Persistence - Database, store abstraction and caching layer

pub mod cache;
pub mod sqlite;
pub mod store;

pub use cache::{ApiCaches, CacheConfig, TtlCache};
pub use sqlite::Database;
pub use store::{InMemoryStore, Registration, RewardStore};
