//! # Product Repository
//!
//! Database operations for the catalog: stock items and services.
//!
//! ## Stock Updates
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │  ❌ Absolute: UPDATE products SET stock = 7                         │
//! │  ✅ Delta:    UPDATE products SET stock = stock - 3                 │
//! │                                                                     │
//! │  Checkout and restock both move stock by deltas inside their own    │
//! │  transaction; a decrement that would go below zero touches no row.  │
//! └─────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{Executor, Sqlite, SqlitePool};
use tracing::debug;

use vetpos_core::validation::{validate_product, validate_search_query};
use vetpos_core::Product;

use super::{expect_row, like_pattern, SqliteQuery};
use crate::changes::ChangeFeed;
use crate::error::DbResult;
use crate::table::Table;

const SELECT: &str = r#"
    SELECT id, name, category, price_cents, cost_cents, stock, min_stock, is_service, created_at
    FROM products
"#;

const INSERT: &str = r#"
    INSERT INTO products (id, name, category, price_cents, cost_cents, stock, min_stock, is_service, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
"#;

const UPSERT: &str = r#"
    INSERT INTO products (id, name, category, price_cents, cost_cents, stock, min_stock, is_service, created_at)
    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
    ON CONFLICT(id) DO UPDATE SET
        name = excluded.name,
        category = excluded.category,
        price_cents = excluded.price_cents,
        cost_cents = excluded.cost_cents,
        stock = excluded.stock,
        min_stock = excluded.min_stock,
        is_service = excluded.is_service,
        created_at = excluded.created_at
"#;

fn bind<'q>(query: SqliteQuery<'q>, product: &'q Product) -> SqliteQuery<'q> {
    query
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.is_service)
        .bind(product.created_at)
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
/// let results = repo.search("kibble").await?;
/// let low = repo.low_stock().await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
    changes: ChangeFeed,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool, changes: ChangeFeed) -> Self {
        ProductRepository { pool, changes }
    }

    /// Whole catalog, by category then name.
    pub async fn list_all(&self) -> DbResult<Vec<Product>> {
        let sql = format!("{SELECT} ORDER BY category COLLATE NOCASE, name COLLATE NOCASE, id");
        Ok(sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?)
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Some(Product))` - Product found
    /// * `Ok(None)` - Product not found
    pub async fn get_by_id(&self, id: &str) -> DbResult<Option<Product>> {
        get_in(&self.pool, id).await
    }

    /// Searches name and category. An empty query lists the catalog.
    pub async fn search(&self, query: &str) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;
        if query.is_empty() {
            return self.list_all().await;
        }

        debug!(query = %query, "Searching products");

        let sql = format!(
            "{SELECT} WHERE name LIKE ?1 ESCAPE '\\' OR category LIKE ?1 ESCAPE '\\' \
             ORDER BY name COLLATE NOCASE, id"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(like_pattern(&query))
            .fetch_all(&self.pool)
            .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Stock products at or below their reorder point, emptiest first.
    pub async fn low_stock(&self) -> DbResult<Vec<Product>> {
        let sql = format!(
            "{SELECT} WHERE is_service = 0 AND stock <= min_stock ORDER BY stock, name COLLATE NOCASE"
        );
        Ok(sqlx::query_as::<_, Product>(&sql).fetch_all(&self.pool).await?)
    }

    /// Distinct categories, for the inventory filter.
    pub async fn categories(&self) -> DbResult<Vec<String>> {
        Ok(sqlx::query_scalar::<_, String>(
            "SELECT DISTINCT category FROM products ORDER BY category COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?)
    }

    /// Inserts a new product.
    pub async fn insert(&self, product: &Product) -> DbResult<()> {
        validate_product(product)?;
        debug!(id = %product.id, name = %product.name, "Inserting product");

        bind(sqlx::query(INSERT), product).execute(&self.pool).await?;

        self.changes.notify(Table::Products);
        Ok(())
    }

    /// Updates an existing product, including a manual stock correction.
    ///
    /// ## Returns
    /// * `Err(DbError::NotFound)` - Product doesn't exist
    pub async fn update(&self, product: &Product) -> DbResult<()> {
        validate_product(product)?;
        debug!(id = %product.id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2, category = ?3, price_cents = ?4, cost_cents = ?5,
                stock = ?6, min_stock = ?7, is_service = ?8
            WHERE id = ?1
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.category)
        .bind(product.price_cents)
        .bind(product.cost_cents)
        .bind(product.stock)
        .bind(product.min_stock)
        .bind(product.is_service)
        .execute(&self.pool)
        .await?;

        expect_row(result, "Product", &product.id)?;
        self.changes.notify(Table::Products);
        Ok(())
    }

    /// Deletes a product.
    ///
    /// ## Returns
    /// * `Err(DbError::ForeignKeyViolation)` - the product appears on a sale
    ///   or restock order
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        expect_row(result, "Product", id)?;
        self.changes.notify_all([Table::Products, Table::Treatments]);
        Ok(())
    }

    pub async fn upsert(&self, product: &Product) -> DbResult<()> {
        upsert_in(&self.pool, product).await?;
        self.changes.notify(Table::Products);
        Ok(())
    }

    pub async fn count(&self) -> DbResult<i64> {
        Ok(sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?)
    }
}

// =============================================================================
// Executor-generic statements
// =============================================================================

pub(crate) async fn get_in<'e, E>(executor: E, id: &str) -> DbResult<Option<Product>>
where
    E: Executor<'e, Database = Sqlite>,
{
    let sql = format!("{SELECT} WHERE id = ?1");
    Ok(sqlx::query_as::<_, Product>(&sql)
        .bind(id)
        .fetch_optional(executor)
        .await?)
}

pub(crate) async fn upsert_in<'e, E>(executor: E, product: &Product) -> DbResult<()>
where
    E: Executor<'e, Database = Sqlite>,
{
    bind(sqlx::query(UPSERT), product).execute(executor).await?;
    Ok(())
}

/// Moves a stock product's level by `delta`. Services are left alone.
///
/// Returns `false` when no row changed: unknown id, a service, or a
/// decrement that would take stock below zero.
pub(crate) async fn adjust_stock_in<'e, E>(executor: E, id: &str, delta: i64) -> DbResult<bool>
where
    E: Executor<'e, Database = Sqlite>,
{
    debug!(id = %id, delta = %delta, "Updating stock");

    let result = sqlx::query(
        r#"
        UPDATE products SET stock = stock + ?2
        WHERE id = ?1 AND is_service = 0 AND stock + ?2 >= 0
        "#,
    )
    .bind(id)
    .bind(delta)
    .execute(executor)
    .await?;

    Ok(result.rows_affected() > 0)
}

#[cfg(test)]
mod tests {
    use crate::{Database, DbConfig};
    use vetpos_core::Product;

    async fn seeded() -> (Database, Product, Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        let mut kibble = Product::new("Kibble 2kg", "food", 1500);
        kibble.stock = 2;
        kibble.min_stock = 5;
        let mut consult = Product::new("Consultation", "services", 2500);
        consult.is_service = true;

        db.products().insert(&kibble).await.unwrap();
        db.products().insert(&consult).await.unwrap();
        (db, kibble, consult)
    }

    #[tokio::test]
    async fn test_search_and_low_stock() {
        let (db, kibble, _) = seeded().await;
        let repo = db.products();

        assert_eq!(repo.search("kib").await.unwrap()[0].id, kibble.id);
        assert_eq!(repo.search("SERVICES").await.unwrap().len(), 1);
        assert_eq!(repo.search("100%").await.unwrap().len(), 0);

        let low = repo.low_stock().await.unwrap();
        assert_eq!(low.len(), 1);
        assert_eq!(low[0].id, kibble.id);

        assert_eq!(repo.categories().await.unwrap(), vec!["food", "services"]);
    }

    #[tokio::test]
    async fn test_adjust_stock_never_goes_negative() {
        let (db, kibble, consult) = seeded().await;

        assert!(super::adjust_stock_in(db.pool(), &kibble.id, -2).await.unwrap());
        assert!(!super::adjust_stock_in(db.pool(), &kibble.id, -1).await.unwrap());
        assert!(!super::adjust_stock_in(db.pool(), &consult.id, 10).await.unwrap());

        let stored = db.products().get_by_id(&kibble.id).await.unwrap().unwrap();
        assert_eq!(stored.stock, 0);
    }
}
