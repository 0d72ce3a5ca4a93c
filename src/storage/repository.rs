use std::collections::HashMap;

use rusqlite::{params, Connection, OptionalExtension, Row};
use tracing::{debug, info, instrument, warn};

use crate::common::error::Result;
use crate::common::types::{
    ProductRecord, ProductSpecification, SaveSummary, StoredCategory, StoredProduct, UpsertOutcome,
};
use crate::normalize::slugify;
use crate::storage::pool::ConnectionPool;

const UPSERT_CATEGORY: &str = "
    INSERT INTO categories (name, slug, description, parent_id)
    VALUES (?1, ?2, ?3, (SELECT id FROM categories WHERE slug = ?4))
    ON CONFLICT(slug) DO UPDATE SET
        name = excluded.name,
        description = COALESCE(?5, categories.description),
        parent_id = COALESCE(excluded.parent_id, categories.parent_id),
        updated_at = datetime('now')
    RETURNING id";

const UPSERT_PRODUCT: &str = "
    INSERT INTO products (name, slug, sku, description, price, stock_quantity,
                          is_featured, is_new, image_url, category_id, brand)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
    ON CONFLICT(slug) DO UPDATE SET
        name = excluded.name,
        sku = excluded.sku,
        description = excluded.description,
        price = excluded.price,
        stock_quantity = excluded.stock_quantity,
        is_featured = excluded.is_featured,
        is_new = excluded.is_new,
        image_url = excluded.image_url,
        category_id = excluded.category_id,
        brand = excluded.brand,
        updated_at = datetime('now')
    RETURNING id";

const UPSERT_SPECIFICATION: &str = "
    INSERT INTO product_specifications (product_id, display, processor, memory, storage,
                                        camera, battery, connectivity, operating_system,
                                        additional_features)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
    ON CONFLICT(product_id) DO UPDATE SET
        display = excluded.display,
        processor = excluded.processor,
        memory = excluded.memory,
        storage = excluded.storage,
        camera = excluded.camera,
        battery = excluded.battery,
        connectivity = excluded.connectivity,
        operating_system = excluded.operating_system,
        additional_features = excluded.additional_features,
        updated_at = datetime('now')
    RETURNING id";

/// Insert or update a category by slug, returning its id.
///
/// New categories without a description get "Products in the {name} category";
/// an existing description is only replaced by an explicit one.
pub fn upsert_category(
    conn: &Connection,
    name: &str,
    description: Option<&str>,
    parent_slug: Option<&str>,
) -> Result<i64> {
    let slug = slugify(name);
    let generated = format!("Products in the {name} category");
    let id = conn.query_row(
        UPSERT_CATEGORY,
        params![name, slug, description.unwrap_or(generated.as_str()), parent_slug, description],
        |row| row.get(0),
    )?;
    Ok(id)
}

/// Insert or update a product by slug; id and slug stay stable on update
pub fn upsert_product(conn: &Connection, record: &ProductRecord, category_id: i64) -> Result<UpsertOutcome> {
    let existing: Option<i64> = conn
        .query_row("SELECT id FROM products WHERE slug = ?1", params![record.slug], |row| row.get(0))
        .optional()?;

    let id = conn.query_row(
        UPSERT_PRODUCT,
        params![
            record.name,
            record.slug,
            record.sku,
            record.description,
            record.price,
            record.stock_quantity,
            record.is_featured,
            record.is_new,
            record.image_url,
            category_id,
            record.brand,
        ],
        |row| row.get(0),
    )?;

    Ok(UpsertOutcome {
        id,
        created: existing.is_none(),
    })
}

pub fn upsert_specification(conn: &Connection, product_id: i64, spec: &ProductSpecification) -> Result<i64> {
    let id = conn.query_row(
        UPSERT_SPECIFICATION,
        params![
            product_id,
            spec.display,
            spec.processor,
            spec.memory,
            spec.storage,
            spec.camera,
            spec.battery,
            spec.connectivity,
            spec.operating_system,
            spec.additional_features,
        ],
        |row| row.get(0),
    )?;
    Ok(id)
}

fn product_from_row(row: &Row<'_>) -> rusqlite::Result<StoredProduct> {
    Ok(StoredProduct {
        id: row.get("id")?,
        name: row.get("name")?,
        slug: row.get("slug")?,
        sku: row.get("sku")?,
        description: row.get("description")?,
        price: row.get("price")?,
        stock_quantity: row.get("stock_quantity")?,
        is_featured: row.get("is_featured")?,
        is_new: row.get("is_new")?,
        image_url: row.get("image_url")?,
        category_id: row.get("category_id")?,
        brand: row.get("brand")?,
    })
}

/// Category, product and specification rows plus the batch writer
#[derive(Clone)]
pub struct CatalogRepository {
    pool: ConnectionPool,
}

impl CatalogRepository {
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    pub async fn upsert_category(
        &self,
        name: &str,
        description: Option<&str>,
        parent_slug: Option<&str>,
    ) -> Result<i64> {
        let conn = self.pool.checkout().await?;
        upsert_category(&conn, name, description, parent_slug)
    }

    /// Upsert one product with its category and specification in one transaction
    pub async fn upsert_product(&self, record: &ProductRecord) -> Result<UpsertOutcome> {
        let mut conn = self.pool.checkout().await?;
        let tx = conn.transaction()?;
        let category_id = upsert_category(&tx, &record.category, None, None)?;
        let outcome = write_product(&tx, record, category_id)?;
        tx.commit()?;
        Ok(outcome)
    }

    pub async fn upsert_specification(&self, product_id: i64, spec: &ProductSpecification) -> Result<i64> {
        let conn = self.pool.checkout().await?;
        upsert_specification(&conn, product_id, spec)
    }

    /// Persist records in batches of `batch_size`.
    ///
    /// Each batch runs on one pooled connection inside one transaction, and
    /// each record inside its own savepoint: a failing record is rolled back,
    /// logged and counted while the rest of the batch commits. If the batch
    /// transaction itself cannot begin or commit, the whole batch counts as
    /// errors.
    #[instrument(skip(self, records), fields(records = records.len()))]
    pub async fn save_products(&self, records: &[ProductRecord], batch_size: usize) -> Result<SaveSummary> {
        let mut summary = SaveSummary::default();
        let mut categories: HashMap<String, i64> = HashMap::new();

        for (index, batch) in records.chunks(batch_size.max(1)).enumerate() {
            let mut conn = self.pool.checkout().await?;
            let batch_summary = match save_batch(&mut conn, batch, &mut categories) {
                Ok(batch_summary) => batch_summary,
                Err(e) => {
                    warn!(batch = index, error = %e, "batch rolled back");
                    SaveSummary {
                        errors: batch.len(),
                        ..Default::default()
                    }
                }
            };
            debug!(batch = index, ?batch_summary, "batch finished");
            summary.merge(&batch_summary);
        }

        info!(
            inserted = summary.inserted,
            updated = summary.updated,
            errors = summary.errors,
            "products saved"
        );
        Ok(summary)
    }

    pub async fn find_product(&self, slug: &str) -> Result<Option<StoredProduct>> {
        let conn = self.pool.checkout().await?;
        let product = conn
            .query_row("SELECT * FROM products WHERE slug = ?1", params![slug], product_from_row)
            .optional()?;
        Ok(product)
    }

    pub async fn find_category(&self, slug: &str) -> Result<Option<StoredCategory>> {
        let conn = self.pool.checkout().await?;
        let category = conn
            .query_row(
                "SELECT id, name, slug, description, parent_id FROM categories WHERE slug = ?1",
                params![slug],
                |row| {
                    Ok(StoredCategory {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        slug: row.get(2)?,
                        description: row.get(3)?,
                        parent_id: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(category)
    }

    pub async fn find_specification(&self, product_id: i64) -> Result<Option<ProductSpecification>> {
        let conn = self.pool.checkout().await?;
        let spec = conn
            .query_row(
                "SELECT display, processor, memory, storage, camera, battery, connectivity,
                        operating_system, additional_features
                 FROM product_specifications WHERE product_id = ?1",
                params![product_id],
                |row| {
                    Ok(ProductSpecification {
                        display: row.get(0)?,
                        processor: row.get(1)?,
                        memory: row.get(2)?,
                        storage: row.get(3)?,
                        camera: row.get(4)?,
                        battery: row.get(5)?,
                        connectivity: row.get(6)?,
                        operating_system: row.get(7)?,
                        additional_features: row.get(8)?,
                    })
                },
            )
            .optional()?;
        Ok(spec)
    }

    pub async fn count_products(&self) -> Result<i64> {
        let conn = self.pool.checkout().await?;
        Ok(conn.query_row("SELECT COUNT(*) FROM products", [], |row| row.get(0))?)
    }

    pub async fn count_categories(&self) -> Result<i64> {
        let conn = self.pool.checkout().await?;
        Ok(conn.query_row("SELECT COUNT(*) FROM categories", [], |row| row.get(0))?)
    }
}

fn write_product(conn: &Connection, record: &ProductRecord, category_id: i64) -> Result<UpsertOutcome> {
    let outcome = upsert_product(conn, record, category_id)?;
    if let Some(spec) = &record.specification {
        upsert_specification(conn, outcome.id, spec)?;
    }
    Ok(outcome)
}

fn save_batch(
    conn: &mut Connection,
    batch: &[ProductRecord],
    categories: &mut HashMap<String, i64>,
) -> Result<SaveSummary> {
    let mut summary = SaveSummary::default();
    let mut tx = conn.transaction()?;
    // Categories created in this batch only become visible to later batches on commit
    let mut pending: Vec<(String, i64)> = Vec::new();

    for record in batch {
        let sp = tx.savepoint()?;
        let category_slug = slugify(&record.category);
        let cached = categories
            .get(&category_slug)
            .copied()
            .or_else(|| pending.iter().find(|(s, _)| *s == category_slug).map(|(_, id)| *id));

        let result = match cached {
            Some(id) => write_product(&sp, record, id).map(|outcome| (outcome, None)),
            None => upsert_category(&sp, &record.category, None, None).and_then(|id| {
                write_product(&sp, record, id).map(|outcome| (outcome, Some(id)))
            }),
        };

        match result.and_then(|r| sp.commit().map(|_| r).map_err(Into::into)) {
            Ok((outcome, new_category)) => {
                if let Some(id) = new_category {
                    pending.push((category_slug, id));
                }
                if outcome.created {
                    summary.inserted += 1;
                } else {
                    summary.updated += 1;
                }
            }
            Err(e) => {
                warn!(slug = %record.slug, error = %e, "failed to save product");
                summary.errors += 1;
            }
        }
    }

    tx.commit()?;
    categories.extend(pending);
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(name: &str, price: f64, category: &str) -> ProductRecord {
        ProductRecord {
            name: name.to_string(),
            slug: slugify(name),
            sku: Some(format!("SKU-{}", slugify(name))),
            description: String::new(),
            price,
            stock_quantity: 10,
            is_featured: false,
            is_new: true,
            image_url: None,
            category: category.to_string(),
            brand: "Generic".to_string(),
            specification: None,
        }
    }

    #[tokio::test]
    async fn test_upsert_category_generates_description() {
        let repo = CatalogRepository::new(ConnectionPool::in_memory().unwrap());
        let id = repo.upsert_category("Phone Parts", None, None).await.unwrap();
        let again = repo.upsert_category("Phone Parts", None, None).await.unwrap();
        assert_eq!(id, again);

        let category = repo.find_category("phone-parts").await.unwrap().unwrap();
        assert_eq!(category.description.as_deref(), Some("Products in the Phone Parts category"));
    }

    #[tokio::test]
    async fn test_upsert_category_with_parent() {
        let repo = CatalogRepository::new(ConnectionPool::in_memory().unwrap());
        let parent = repo.upsert_category("Apple", None, None).await.unwrap();
        repo.upsert_category("iPhone 12", Some("Screens and batteries"), Some("apple"))
            .await
            .unwrap();

        let child = repo.find_category("iphone-12").await.unwrap().unwrap();
        assert_eq!(child.parent_id, Some(parent));
        assert_eq!(child.description.as_deref(), Some("Screens and batteries"));
    }

    #[tokio::test]
    async fn test_upsert_product_is_idempotent() {
        let repo = CatalogRepository::new(ConnectionPool::in_memory().unwrap());
        let first = repo.upsert_product(&record("iPhone 12 Screen", 10.0, "Screens")).await.unwrap();
        assert!(first.created);

        let mut changed = record("iPhone 12 Screen", 12.5, "Screens");
        changed.description = "Updated".to_string();
        let second = repo.upsert_product(&changed).await.unwrap();
        assert!(!second.created);
        assert_eq!(first.id, second.id);

        assert_eq!(repo.count_products().await.unwrap(), 1);
        let stored = repo.find_product("iphone-12-screen").await.unwrap().unwrap();
        assert_eq!(stored.price, 12.5);
        assert_eq!(stored.description, "Updated");
    }

    #[tokio::test]
    async fn test_failing_item_does_not_abort_batch() {
        let repo = CatalogRepository::new(ConnectionPool::in_memory().unwrap());
        let records = vec![
            record("Good One", 1.0, "Parts"),
            record("Bad Price", -1.0, "Broken Category"),
            record("Good Two", 2.0, "Parts"),
        ];

        let summary = repo.save_products(&records, 10).await.unwrap();
        assert_eq!(summary, SaveSummary { inserted: 2, updated: 0, errors: 1 });
        assert_eq!(repo.count_products().await.unwrap(), 2);
        // The failed item's category was rolled back with it
        assert!(repo.find_category("broken-category").await.unwrap().is_none());
        assert_eq!(repo.count_categories().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_specification_round_trip() {
        let repo = CatalogRepository::new(ConnectionPool::in_memory().unwrap());
        let mut rec = record("Galaxy S21 Battery", 15.0, "Batteries");
        rec.specification = Some(ProductSpecification {
            battery: Some("4000 mAh".to_string()),
            additional_features: Some(r#"{"color":"black"}"#.to_string()),
            ..Default::default()
        });

        let summary = repo.save_products(&[rec.clone()], 1).await.unwrap();
        assert_eq!(summary.inserted, 1);
        let stored = repo.find_product(&rec.slug).await.unwrap().unwrap();
        let spec = repo.find_specification(stored.id).await.unwrap().unwrap();
        assert_eq!(spec.battery.as_deref(), Some("4000 mAh"));

        let summary = repo.save_products(&[rec], 1).await.unwrap();
        assert_eq!(summary, SaveSummary { inserted: 0, updated: 1, errors: 0 });
    }
}
