pub mod memory;
pub mod postgres;
pub mod redis;
pub mod store;

pub use memory::{InMemoryCallLogStore, InMemoryListingStore, InMemoryUserStore};
pub use postgres::{create_pool, run_migrations, PgCallLogStore, PgListingStore, PgUserStore};
// `self::` keeps the local module distinct from the redis crate
pub use self::redis::{create_redis_client, Cache, CacheKey};
pub use store::{CallLogStore, ListingStore, UserStore};
