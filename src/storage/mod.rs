//! SQLite catalog store: connection pool, schema and the slug-keyed repository.

pub mod pool;
pub mod repository;
pub mod schema;

pub use pool::{ConnectionPool, PooledConnection};
pub use repository::CatalogRepository;
