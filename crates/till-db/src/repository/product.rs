//! # Product Repository
//!
//! The catalog store: products and their live stock.
//!
//! ## Atomic Stock Changes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Stock Update Strategy                                │
//! │                                                                         │
//! │  ❌ WRONG: read, check, write back                                     │
//! │     SELECT stock ...;  -- 1                                            │
//! │     UPDATE products SET stock = 0 ...   (second till also read 1)      │
//! │                                                                         │
//! │  ✅ CORRECT: one conditional statement per key                         │
//! │     UPDATE products SET stock = stock + :delta                          │
//! │     WHERE id = :id AND is_active = 1 AND stock + :delta >= 0           │
//! │     RETURNING ...                                                      │
//! │                                                                         │
//! │  No row back → the product is missing/retired, or stock is too low.    │
//! │  A CHECK (stock >= 0) constraint backs this up in the schema.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Retired products (`is_active = 0`) behave as missing for every read and
//! write here; their historical sale lines stay valid.

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use till_core::validation::validate_search_query;
use till_core::{CoreError, NewProduct, Permission, Principal, Product, ProductUpdate};

/// Attempts made by [`ProductRepository::update`] before giving up with
/// [`DbError::Conflict`].
const UPDATE_ATTEMPTS: usize = 3;

/// Outcome of a conditional stock change.
#[derive(Debug)]
pub(crate) enum StockChange {
    /// Applied; the row as it is after the change.
    Applied(Product),
    /// The product exists but `stock + delta` would be negative.
    Rejected { stock: i64 },
    /// No active product with this id.
    Missing,
}

/// Adds `delta` to a product's stock if the result stays non-negative.
///
/// Shared by [`ProductRepository::adjust_stock`] and the sale recorder, which
/// calls it inside its own transaction.
pub(crate) async fn apply_stock_delta(
    conn: &mut SqliteConnection,
    id: &str,
    delta: i64,
) -> DbResult<StockChange> {
    let updated = sqlx::query_as::<_, Product>(
        r#"
        UPDATE products
        SET
            stock = stock + ?1,
            updated_at = ?2,
            version = version + 1
        WHERE id = ?3 AND is_active = 1 AND stock + ?1 >= 0
        RETURNING
            id, name, category, price_cents, stock, barcode,
            min_stock, is_active, created_at, updated_at, version
        "#,
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    if let Some(product) = updated {
        return Ok(StockChange::Applied(product));
    }

    let stock: Option<i64> =
        sqlx::query_scalar("SELECT stock FROM products WHERE id = ?1 AND is_active = 1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(match stock {
        Some(stock) => StockChange::Rejected { stock },
        None => StockChange::Missing,
    })
}

/// Repository for catalog operations.
///
/// ## Usage
/// ```rust,ignore
/// let repo = db.products();
///
/// let rice = repo.get(&rice_id).await?;
/// let rice = repo.adjust_stock(&rice_id, -2).await?;
/// let hits = repo.search("oil", 20).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Gets an active product.
    ///
    /// ## Errors
    /// `Domain(ProductNotFound)` for unknown or retired ids.
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        debug!(id = %id, "Getting product");

        self.find(id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(id.to_string()).into())
    }

    /// Like [`get`](Self::get), but `None` for unknown or retired ids.
    pub async fn find(&self, id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, category, price_cents, stock, barcode,
                min_stock, is_active, created_at, updated_at, version
            FROM products
            WHERE id = ?1 AND is_active = 1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Lists active products ordered by name.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, category, price_cents, stock, barcode,
                min_stock, is_active, created_at, updated_at, version
            FROM products
            WHERE is_active = 1
            ORDER BY name, id
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Listed products");
        Ok(products)
    }

    /// Case-insensitive substring search over name, category and barcode.
    ///
    /// An empty query lists the catalog.
    pub async fn search(&self, query: &str, limit: u32) -> DbResult<Vec<Product>> {
        let query = validate_search_query(query)?;

        debug!(query = %query, limit = %limit, "Searching products");

        if query.is_empty() {
            let mut products = self.list().await?;
            products.truncate(limit as usize);
            return Ok(products);
        }

        let pattern = format!("%{}%", escape_like(&query.to_lowercase()));

        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, category, price_cents, stock, barcode,
                min_stock, is_active, created_at, updated_at, version
            FROM products
            WHERE is_active = 1
            AND (
                lower(name) LIKE ?1 ESCAPE '\'
                OR lower(category) LIKE ?1 ESCAPE '\'
                OR lower(barcode) LIKE ?1 ESCAPE '\'
            )
            ORDER BY name, id
            LIMIT ?2
            "#,
        )
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        debug!(count = products.len(), "Search returned products");
        Ok(products)
    }

    /// Scanner lookup.
    pub async fn get_by_barcode(&self, barcode: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            r#"
            SELECT
                id, name, category, price_cents, stock, barcode,
                min_stock, is_active, created_at, updated_at, version
            FROM products
            WHERE barcode = ?1 AND is_active = 1
            "#,
        )
        .bind(barcode.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Counts active products.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products WHERE is_active = 1")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }

    // =========================================================================
    // Stock
    // =========================================================================

    /// Atomically adds `delta` to a product's stock.
    ///
    /// ## Errors
    /// - `Domain(ProductNotFound)` for unknown or retired ids
    /// - `Domain(WouldGoNegative)` when `stock + delta < 0`; stock is unchanged
    pub async fn adjust_stock(&self, id: &str, delta: i64) -> DbResult<Product> {
        debug!(id = %id, delta = %delta, "Adjusting stock");

        let mut conn = self.pool.acquire().await?;

        match apply_stock_delta(&mut conn, id, delta).await? {
            StockChange::Applied(product) => Ok(product),
            StockChange::Rejected { stock } => {
                warn!(id = %id, stock, delta, "Stock adjustment rejected");
                Err(CoreError::WouldGoNegative {
                    product_id: id.to_string(),
                    stock,
                    delta,
                }
                .into())
            }
            StockChange::Missing => Err(CoreError::ProductNotFound(id.to_string()).into()),
        }
    }

    // =========================================================================
    // Catalog Management
    // =========================================================================

    /// Adds a product to the catalog.
    ///
    /// ## Errors
    /// - `Domain(Forbidden)` unless the principal may edit the catalog
    /// - `Domain(Validation)` for bad input
    /// - `UniqueViolation` when the barcode is taken
    pub async fn create(&self, principal: &Principal, input: NewProduct) -> DbResult<Product> {
        principal.authorize(Permission::EditCatalog)?;
        input.validate()?;

        let now = Utc::now();
        let id = Uuid::new_v4().to_string();

        let product = sqlx::query_as::<_, Product>(
            r#"
            INSERT INTO products (
                id, name, category, price_cents, stock, barcode,
                min_stock, is_active, created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?8, 0)
            RETURNING
                id, name, category, price_cents, stock, barcode,
                min_stock, is_active, created_at, updated_at, version
            "#,
        )
        .bind(&id)
        .bind(input.name.trim())
        .bind(input.category.trim())
        .bind(input.price_cents)
        .bind(input.stock)
        .bind(input.barcode.trim())
        .bind(input.min_stock)
        .bind(now)
        .fetch_one(&self.pool)
        .await?;

        info!(
            id = %product.id,
            name = %product.name,
            by = %principal.id,
            "Product created"
        );
        Ok(product)
    }

    /// Applies a merge-patch to a product. Stock is not patchable here.
    ///
    /// Compare-and-set on `version`: a concurrent stock change or edit makes
    /// the write miss, and the patch is re-applied to a fresh read.
    pub async fn update(
        &self,
        principal: &Principal,
        id: &str,
        patch: &ProductUpdate,
    ) -> DbResult<Product> {
        principal.authorize(Permission::EditCatalog)?;

        if patch.is_empty() {
            return self.get(id).await;
        }

        for attempt in 1..=UPDATE_ATTEMPTS {
            let mut product = self.get(id).await?;
            let expected_version = product.version;
            patch.apply(&mut product)?;

            let updated = sqlx::query_as::<_, Product>(
                r#"
                UPDATE products
                SET
                    name = ?1,
                    category = ?2,
                    price_cents = ?3,
                    barcode = ?4,
                    min_stock = ?5,
                    updated_at = ?6,
                    version = version + 1
                WHERE id = ?7 AND version = ?8 AND is_active = 1
                RETURNING
                    id, name, category, price_cents, stock, barcode,
                    min_stock, is_active, created_at, updated_at, version
                "#,
            )
            .bind(&product.name)
            .bind(&product.category)
            .bind(product.price_cents)
            .bind(&product.barcode)
            .bind(product.min_stock)
            .bind(Utc::now())
            .bind(id)
            .bind(expected_version)
            .fetch_optional(&self.pool)
            .await?;

            if let Some(updated) = updated {
                info!(id = %id, version = updated.version, by = %principal.id, "Product updated");
                return Ok(updated);
            }

            warn!(id = %id, attempt, "Product changed during update, retrying");
        }

        Err(DbError::Conflict {
            entity: "Product".to_string(),
            id: id.to_string(),
        })
    }

    /// Manual stock correction or delivery, by an authorised principal.
    pub async fn restock(&self, principal: &Principal, id: &str, delta: i64) -> DbResult<Product> {
        principal.authorize(Permission::EditCatalog)?;

        let product = self.adjust_stock(id, delta).await?;
        info!(id = %id, delta, stock = product.stock, by = %principal.id, "Stock adjusted");
        Ok(product)
    }

    /// Soft-removes a product from the catalog.
    ///
    /// Historical sales still reference it, so the row stays.
    pub async fn retire(&self, principal: &Principal, id: &str) -> DbResult<()> {
        principal.authorize(Permission::EditCatalog)?;

        let result = sqlx::query(
            r#"
            UPDATE products
            SET
                is_active = 0,
                updated_at = ?1,
                version = version + 1
            WHERE id = ?2 AND is_active = 1
            "#,
        )
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(CoreError::ProductNotFound(id.to_string()).into());
        }

        info!(id = %id, by = %principal.id, "Product retired");
        Ok(())
    }
}

/// Escapes LIKE wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for c in input.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use till_core::Role;

    fn admin() -> Principal {
        Principal::new("u1", "Erica Monacillo", Role::Admin)
    }

    fn cashier() -> Principal {
        Principal::new("u2", "Jars Christian Lerio", Role::Cashier)
    }

    fn new_product(name: &str, category: &str, barcode: &str, price_cents: i64, stock: i64) -> NewProduct {
        NewProduct {
            name: name.to_string(),
            category: category.to_string(),
            price_cents,
            stock,
            barcode: barcode.to_string(),
            min_stock: 5,
        }
    }

    async fn setup() -> (Database, ProductRepository) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.products();
        (db, repo)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (_db, repo) = setup().await;
        let created = repo
            .create(&admin(), new_product("  Sugar 1kg ", "Groceries", "8901234567892", 6500, 45))
            .await
            .unwrap();

        assert_eq!(created.name, "Sugar 1kg");
        assert!(created.is_active);
        assert_eq!(created.version, 0);

        let fetched = repo.get(&created.id).await.unwrap();
        assert_eq!(fetched, created);
        assert_eq!(repo.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_list_is_ordered_by_name() {
        let (_db, repo) = setup().await;
        repo.create(&admin(), new_product("Sugar 1kg", "Groceries", "1", 6500, 45))
            .await
            .unwrap();
        repo.create(&admin(), new_product("Cooking Oil 1L", "Groceries", "2", 18000, 30))
            .await
            .unwrap();

        let names: Vec<String> = repo.list().await.unwrap().into_iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Cooking Oil 1L", "Sugar 1kg"]);
    }

    #[tokio::test]
    async fn test_create_requires_permission_and_valid_input() {
        let (_db, repo) = setup().await;

        let err = repo
            .create(&cashier(), new_product("Sugar 1kg", "Groceries", "1", 6500, 45))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Forbidden { .. })));

        let err = repo
            .create(&admin(), new_product("", "Groceries", "1", 6500, 45))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        let err = repo
            .create(&admin(), new_product("Sugar", "Groceries", "1", -1, 45))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));

        let err = repo
            .create(&admin(), new_product("Sugar", "Groceries", "1", i64::MAX / 2 + 1, 45))
            .await
            .unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Validation(_))));
        assert_eq!(repo.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_duplicate_barcode() {
        let (_db, repo) = setup().await;
        repo.create(&admin(), new_product("Sugar 1kg", "Groceries", "8901234567892", 6500, 45))
            .await
            .unwrap();

        let err = repo
            .create(&admin(), new_product("Sugar 2kg", "Groceries", "8901234567892", 12000, 5))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { .. }));
    }

    #[tokio::test]
    async fn test_adjust_stock() {
        let (_db, repo) = setup().await;
        let p = repo
            .create(&admin(), new_product("Sugar 1kg", "Groceries", "1", 6500, 3))
            .await
            .unwrap();

        let after = repo.adjust_stock(&p.id, 7).await.unwrap();
        assert_eq!(after.stock, 10);
        assert_eq!(after.version, 1);

        let after = repo.adjust_stock(&p.id, -10).await.unwrap();
        assert_eq!(after.stock, 0);

        let err = repo.adjust_stock(&p.id, -1).await.unwrap_err();
        assert_eq!(
            err.as_domain(),
            Some(&CoreError::WouldGoNegative {
                product_id: p.id.clone(),
                stock: 0,
                delta: -1,
            })
        );
        assert_eq!(repo.get(&p.id).await.unwrap().stock, 0);

        let err = repo.adjust_stock("missing", 1).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_update_patches_and_bumps_version() {
        let (_db, repo) = setup().await;
        let p = repo
            .create(&admin(), new_product("Sugar 1kg", "Groceries", "1", 6500, 45))
            .await
            .unwrap();
        repo.adjust_stock(&p.id, -5).await.unwrap();

        let patch = ProductUpdate {
            price_cents: Some(7000),
            min_stock: Some(12),
            ..Default::default()
        };
        let updated = repo.update(&admin(), &p.id, &patch).await.unwrap();

        assert_eq!(updated.price_cents, 7000);
        assert_eq!(updated.min_stock, 12);
        assert_eq!(updated.stock, 40);
        assert_eq!(updated.version, 2);
        assert_eq!(updated.name, "Sugar 1kg");

        let unchanged = repo
            .update(&admin(), &p.id, &ProductUpdate::default())
            .await
            .unwrap();
        assert_eq!(unchanged, updated);

        let err = repo.update(&cashier(), &p.id, &patch).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::Forbidden { .. })));
    }

    #[tokio::test]
    async fn test_restock_requires_permission() {
        let (_db, repo) = setup().await;
        let p = repo
            .create(&admin(), new_product("Sugar 1kg", "Groceries", "1", 6500, 0))
            .await
            .unwrap();

        assert_eq!(repo.restock(&admin(), &p.id, 24).await.unwrap().stock, 24);
        assert!(repo.restock(&cashier(), &p.id, 24).await.is_err());
        assert_eq!(repo.get(&p.id).await.unwrap().stock, 24);
    }

    #[tokio::test]
    async fn test_retired_products_disappear() {
        let (_db, repo) = setup().await;
        let p = repo
            .create(&admin(), new_product("Sugar 1kg", "Groceries", "1", 6500, 10))
            .await
            .unwrap();

        repo.retire(&admin(), &p.id).await.unwrap();

        assert!(repo.find(&p.id).await.unwrap().is_none());
        assert!(repo.get_by_barcode("1").await.unwrap().is_none());
        assert_eq!(repo.count().await.unwrap(), 0);
        assert!(repo.adjust_stock(&p.id, 1).await.is_err());

        let err = repo.retire(&admin(), &p.id).await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::ProductNotFound(_))));
    }

    #[tokio::test]
    async fn test_search() {
        let (_db, repo) = setup().await;
        repo.create(&admin(), new_product("Cooking Oil 1L", "Groceries", "8901234567891", 18000, 30))
            .await
            .unwrap();
        repo.create(&admin(), new_product("Coffee 3-in-1 Pack", "Beverages", "8901234567893", 12000, 60))
            .await
            .unwrap();

        let hits = repo.search("OIL", 20).await.unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].name, "Cooking Oil 1L");

        assert_eq!(repo.search("beverages", 20).await.unwrap().len(), 1);
        assert_eq!(repo.search("567893", 20).await.unwrap().len(), 1);
        assert_eq!(repo.search("co", 20).await.unwrap().len(), 2);
        assert_eq!(repo.search("co", 1).await.unwrap().len(), 1);
        assert!(repo.search("%", 20).await.unwrap().is_empty());
        assert_eq!(repo.search("   ", 20).await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_get_by_barcode() {
        let (_db, repo) = setup().await;
        let p = repo
            .create(&admin(), new_product("Sugar 1kg", "Groceries", "8901234567892", 6500, 45))
            .await
            .unwrap();

        let found = repo.get_by_barcode(" 8901234567892 ").await.unwrap();
        assert_eq!(found.map(|f| f.id), Some(p.id));
        assert!(repo.get_by_barcode("0000").await.unwrap().is_none());
    }

    #[test]
    fn test_escape_like() {
        assert_eq!(escape_like("50%_off"), "50\\%\\_off");
        assert_eq!(escape_like("rice"), "rice");
    }
}
