use std::ops::{Deref, DerefMut};
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rusqlite::Connection;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tracing::{debug, info};

use crate::common::error::{Result, ScraperError};
use crate::storage::schema;

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

struct PoolInner {
    idle: Mutex<Vec<Connection>>,
    permits: Arc<Semaphore>,
    size: usize,
}

/// Fixed-size pool of SQLite connections.
///
/// `checkout` waits until a connection is free; the connection goes back to
/// the pool when the returned guard is dropped.
#[derive(Clone)]
pub struct ConnectionPool {
    inner: Arc<PoolInner>,
}

fn is_in_memory(path: &Path) -> bool {
    let raw = path.to_string_lossy();
    raw.is_empty() || raw == ":memory:"
}

fn open_connection(path: &Path) -> Result<Connection> {
    let conn = if is_in_memory(path) {
        Connection::open_in_memory()?
    } else {
        Connection::open(path)?
    };
    let _mode: String = conn.pragma_update_and_check(None, "journal_mode", "WAL", |row| row.get(0))?;
    conn.pragma_update(None, "foreign_keys", "ON")?;
    conn.busy_timeout(BUSY_TIMEOUT)?;
    Ok(conn)
}

impl ConnectionPool {
    /// Open `size` connections to the database file and run migrations.
    ///
    /// An in-memory database is private to its connection, so it always gets
    /// a pool of one.
    pub fn open(path: impl AsRef<Path>, size: usize) -> Result<Self> {
        let path = path.as_ref();
        let size = if is_in_memory(path) { 1 } else { size.max(1) };

        if !is_in_memory(path) {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                std::fs::create_dir_all(parent)?;
            }
        }

        let connections = (0..size)
            .map(|_| open_connection(path))
            .collect::<Result<Vec<_>>>()?;
        if let Some(first) = connections.first() {
            schema::migrate(first)?;
        }

        info!(path = %path.display(), size, "database pool opened");
        Ok(Self {
            inner: Arc::new(PoolInner {
                idle: Mutex::new(connections),
                permits: Arc::new(Semaphore::new(size)),
                size,
            }),
        })
    }

    pub fn in_memory() -> Result<Self> {
        Self::open(":memory:", 1)
    }

    pub fn size(&self) -> usize {
        self.inner.size
    }

    pub async fn checkout(&self) -> Result<PooledConnection> {
        let permit = self
            .inner
            .permits
            .clone()
            .acquire_owned()
            .await
            .map_err(|e| ScraperError::Pool(format!("pool closed: {e}")))?;

        let conn = self
            .inner
            .idle
            .lock()
            .map_err(|_| ScraperError::Pool("connection list poisoned".to_string()))?
            .pop()
            .ok_or_else(|| ScraperError::Pool("no idle connection despite free permit".to_string()))?;

        debug!("connection checked out");
        Ok(PooledConnection {
            conn: Some(conn),
            pool: self.inner.clone(),
            _permit: permit,
        })
    }
}

/// A checked-out connection; returned to its pool on drop
pub struct PooledConnection {
    conn: Option<Connection>,
    pool: Arc<PoolInner>,
    _permit: OwnedSemaphorePermit,
}

impl Deref for PooledConnection {
    type Target = Connection;

    fn deref(&self) -> &Connection {
        // Only taken in Drop
        self.conn.as_ref().expect("connection present until drop")
    }
}

impl DerefMut for PooledConnection {
    fn deref_mut(&mut self) -> &mut Connection {
        self.conn.as_mut().expect("connection present until drop")
    }
}

impl Drop for PooledConnection {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            if let Ok(mut idle) = self.pool.idle.lock() {
                idle.push(conn);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[tokio::test]
    async fn test_in_memory_forces_single_connection() {
        let pool = ConnectionPool::open(":memory:", 8).unwrap();
        assert_eq!(pool.size(), 1);
        let conn = pool.checkout().await.unwrap();
        let n: i64 = conn.query_row("SELECT COUNT(*) FROM products", [], |r| r.get(0)).unwrap();
        assert_eq!(n, 0);
    }

    #[tokio::test]
    async fn test_connection_returns_on_drop() {
        let dir = tempdir().unwrap();
        let pool = ConnectionPool::open(dir.path().join("nested/catalog.db"), 2).unwrap();

        let a = pool.checkout().await.unwrap();
        let b = pool.checkout().await.unwrap();
        assert_eq!(pool.inner.permits.available_permits(), 0);
        drop(a);
        assert_eq!(pool.inner.permits.available_permits(), 1);
        let _c = pool.checkout().await.unwrap();
        drop(b);
        assert_eq!(pool.inner.idle.lock().unwrap().len(), 1);
    }
}
