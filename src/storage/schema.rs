use crate::common::error::Result;
use rusqlite::Connection;
use tracing::info;

const CREATE_CATALOG: &str = include_str!("../../migrations/001_create_catalog.sql");

/// Create the catalog tables if they do not exist yet
pub fn migrate(conn: &Connection) -> Result<()> {
    info!("Running database migrations...");
    conn.execute_batch(CREATE_CATALOG)?;
    info!("Database migrations completed successfully");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migrate_is_repeatable() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        migrate(&conn).unwrap();

        let tables: i64 = conn
            .query_row(
                "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name IN ('categories', 'products', 'product_specifications')",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(tables, 3);
    }

    #[test]
    fn test_negative_price_rejected() {
        let conn = Connection::open_in_memory().unwrap();
        migrate(&conn).unwrap();
        let result = conn.execute(
            "INSERT INTO products (name, slug, price) VALUES ('x', 'x', -1)",
            [],
        );
        assert!(result.is_err());
    }
}
