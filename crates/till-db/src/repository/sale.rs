//! # Sale Repository
//!
//! Read side of the append-only sale collection, plus the row mapping the
//! sale recorder uses to write it.
//!
//! ## Storage Shape
//! ```text
//! sales                                 sale_lines
//! ┌──────────────────────────────┐      ┌──────────────────────────────┐
//! │ id, receipt_number (UNIQUE)  │◄────┐│ sale_id, line_no  (PK)       │
//! │ attempt_id (UNIQUE)          │     └┤ product_id, product_name     │
//! │ total_cents, payment_*       │      │ quantity, unit_price_cents   │
//! │ cashier_id, cashier_name     │      │ subtotal_cents               │
//! │ created_at                   │      └──────────────────────────────┘
//! └──────────────────────────────┘
//!        UPDATE / DELETE rejected by triggers on both tables
//! ```

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, QueryBuilder, Sqlite, SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use till_core::{CoreError, Payment, PaymentMethod, Sale, SaleLine};

/// Sale ids per `IN (...)` batch when loading lines.
const LINE_BATCH: usize = 500;

#[derive(Debug, FromRow)]
struct SaleRow {
    id: String,
    receipt_number: String,
    attempt_id: String,
    total_cents: i64,
    payment_method: PaymentMethod,
    tendered_cents: Option<i64>,
    change_cents: Option<i64>,
    payment_reference: Option<String>,
    cashier_id: String,
    cashier_name: String,
    created_at: DateTime<Utc>,
}

impl SaleRow {
    fn into_sale(self, items: Vec<SaleLine>) -> Sale {
        Sale {
            id: self.id,
            receipt_number: self.receipt_number,
            attempt_id: self.attempt_id,
            items,
            total_cents: self.total_cents,
            payment: Payment {
                method: self.payment_method,
                tendered_cents: self.tendered_cents,
                change_cents: self.change_cents,
                reference: self.payment_reference,
            },
            cashier_id: self.cashier_id,
            cashier_name: self.cashier_name,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct LineRow {
    sale_id: String,
    #[sqlx(flatten)]
    line: SaleLine,
}

async fn fetch_lines(conn: &mut SqliteConnection, sale_id: &str) -> DbResult<Vec<SaleLine>> {
    let lines = sqlx::query_as::<_, SaleLine>(
        r#"
        SELECT product_id, product_name, quantity, unit_price_cents, subtotal_cents
        FROM sale_lines
        WHERE sale_id = ?1
        ORDER BY line_no
        "#,
    )
    .bind(sale_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(lines)
}

/// Loads lines for many sales in batches and assembles them, keeping row order.
async fn attach_lines(conn: &mut SqliteConnection, rows: Vec<SaleRow>) -> DbResult<Vec<Sale>> {
    let mut lines: HashMap<String, Vec<SaleLine>> = HashMap::with_capacity(rows.len());

    for chunk in rows.chunks(LINE_BATCH) {
        let mut builder = QueryBuilder::<Sqlite>::new(
            "SELECT sale_id, product_id, product_name, quantity, unit_price_cents, subtotal_cents \
             FROM sale_lines WHERE sale_id IN (",
        );
        let mut ids = builder.separated(", ");
        for row in chunk {
            ids.push_bind(row.id.clone());
        }
        ids.push_unseparated(") ORDER BY sale_id, line_no");

        let batch = builder
            .build_query_as::<LineRow>()
            .fetch_all(&mut *conn)
            .await?;

        for row in batch {
            lines.entry(row.sale_id).or_default().push(row.line);
        }
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let items = lines.remove(&row.id).unwrap_or_default();
            row.into_sale(items)
        })
        .collect())
}

/// Finds the sale created by a commit attempt, if any.
pub(crate) async fn find_by_attempt(
    conn: &mut SqliteConnection,
    attempt_id: &str,
) -> DbResult<Option<Sale>> {
    let row = sqlx::query_as::<_, SaleRow>(
        r#"
        SELECT
            id, receipt_number, attempt_id, total_cents,
            payment_method, tendered_cents, change_cents, payment_reference,
            cashier_id, cashier_name, created_at
        FROM sales
        WHERE attempt_id = ?1
        "#,
    )
    .bind(attempt_id)
    .fetch_optional(&mut *conn)
    .await?;

    match row {
        Some(row) => {
            let items = fetch_lines(conn, &row.id).await?;
            Ok(Some(row.into_sale(items)))
        }
        None => Ok(None),
    }
}

/// Writes a sale and its lines. Must run inside the caller's transaction.
pub(crate) async fn insert_sale(conn: &mut SqliteConnection, sale: &Sale) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO sales (
            id, receipt_number, attempt_id, total_cents,
            payment_method, tendered_cents, change_cents, payment_reference,
            cashier_id, cashier_name, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
        "#,
    )
    .bind(&sale.id)
    .bind(&sale.receipt_number)
    .bind(&sale.attempt_id)
    .bind(sale.total_cents)
    .bind(sale.payment.method)
    .bind(sale.payment.tendered_cents)
    .bind(sale.payment.change_cents)
    .bind(&sale.payment.reference)
    .bind(&sale.cashier_id)
    .bind(&sale.cashier_name)
    .bind(sale.created_at)
    .execute(&mut *conn)
    .await?;

    for (line_no, line) in sale.items.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO sale_lines (
                sale_id, line_no, product_id, product_name,
                quantity, unit_price_cents, subtotal_cents
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&sale.id)
        .bind(line_no as i64)
        .bind(&line.product_id)
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.subtotal_cents)
        .execute(&mut *conn)
        .await?;
    }

    Ok(())
}

/// Repository for committed sales.
///
/// Sales are written only by the [`SaleRecorder`](crate::SaleRecorder);
/// this type never mutates them.
#[derive(Debug, Clone)]
pub struct SaleRepository {
    pool: SqlitePool,
}

impl SaleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRepository { pool }
    }

    /// Gets a sale by id.
    ///
    /// ## Errors
    /// `Domain(SaleNotFound)` when no such sale exists.
    pub async fn get(&self, id: &str) -> DbResult<Sale> {
        debug!(id = %id, "Getting sale");

        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT
                id, receipt_number, attempt_id, total_cents,
                payment_method, tendered_cents, change_cents, payment_reference,
                cashier_id, cashier_name, created_at
            FROM sales
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(id.to_string()))?;

        let items = fetch_lines(&mut conn, &row.id).await?;
        Ok(row.into_sale(items))
    }

    /// Gets a sale by its receipt number.
    pub async fn get_by_receipt(&self, receipt_number: &str) -> DbResult<Sale> {
        debug!(receipt = %receipt_number, "Getting sale by receipt");

        let mut conn = self.pool.acquire().await?;
        let row = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT
                id, receipt_number, attempt_id, total_cents,
                payment_method, tendered_cents, change_cents, payment_reference,
                cashier_id, cashier_name, created_at
            FROM sales
            WHERE receipt_number = ?1
            "#,
        )
        .bind(receipt_number)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| CoreError::SaleNotFound(receipt_number.to_string()))?;

        let items = fetch_lines(&mut conn, &row.id).await?;
        Ok(row.into_sale(items))
    }

    /// Lists all sales, newest first.
    pub async fn list(&self) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT
                id, receipt_number, attempt_id, total_cents,
                payment_method, tendered_cents, change_cents, payment_reference,
                cashier_id, cashier_name, created_at
            FROM sales
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        debug!(count = rows.len(), "Listed sales");
        attach_lines(&mut conn, rows).await
    }

    /// Lists sales with `from <= created_at < to`, newest first.
    pub async fn list_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> DbResult<Vec<Sale>> {
        let mut conn = self.pool.acquire().await?;
        let rows = sqlx::query_as::<_, SaleRow>(
            r#"
            SELECT
                id, receipt_number, attempt_id, total_cents,
                payment_method, tendered_cents, change_cents, payment_reference,
                cashier_id, cashier_name, created_at
            FROM sales
            WHERE created_at >= ?1 AND created_at < ?2
            ORDER BY created_at DESC, id DESC
            "#,
        )
        .bind(from)
        .bind(to)
        .fetch_all(&mut *conn)
        .await?;

        debug!(count = rows.len(), %from, %to, "Listed sales in range");
        attach_lines(&mut conn, rows).await
    }

    /// Counts committed sales.
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM sales")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::pool::{Database, DbConfig};
    use chrono::Duration;
    use till_core::{CartSession, Money, NewProduct, Principal, Role, Tender};
    use uuid::Uuid;

    async fn setup() -> (Database, till_core::Product) {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let admin = Principal::new("u1", "Erica Monacillo", Role::Admin);
        let product = db
            .products()
            .create(
                &admin,
                NewProduct {
                    name: "Instant Noodles Pack".to_string(),
                    category: "Food".to_string(),
                    price_cents: 8500,
                    stock: 100,
                    barcode: "8901234567894".to_string(),
                    min_stock: 20,
                },
            )
            .await
            .unwrap();
        (db, product)
    }

    async fn sell(db: &Database, product: &till_core::Product, qty: i64) -> Sale {
        let cashier = Principal::new("u2", "Jars Christian Lerio", Role::Cashier);
        let mut cart = CartSession::new();
        cart.add_item(product, qty).unwrap();
        let tender = Tender::cash(Money::from_cents(product.price_cents * qty));
        db.recorder()
            .commit(&cart, &tender, &cashier, &Uuid::new_v4().to_string())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_get_and_get_by_receipt() {
        let (db, product) = setup().await;
        let sale = sell(&db, &product, 3).await;

        let by_id = db.sales().get(&sale.id).await.unwrap();
        assert_eq!(by_id, sale);
        assert_eq!(by_id.items.len(), 1);
        assert_eq!(by_id.items[0].subtotal_cents, 25500);

        let by_receipt = db.sales().get_by_receipt(&sale.receipt_number).await.unwrap();
        assert_eq!(by_receipt.id, sale.id);

        let err = db.sales().get("nope").await.unwrap_err();
        assert!(matches!(err.as_domain(), Some(CoreError::SaleNotFound(_))));
    }

    #[tokio::test]
    async fn test_list_and_range() {
        let (db, product) = setup().await;
        let first = sell(&db, &product, 1).await;
        let second = sell(&db, &product, 2).await;

        let all = db.sales().list().await.unwrap();
        assert_eq!(all.len(), 2);
        assert!(all.iter().all(|s| s.items.len() == 1));
        assert!(all.iter().any(|s| s.id == first.id));
        assert!(all.iter().any(|s| s.id == second.id));
        assert!(all[0].created_at >= all[1].created_at);
        assert_eq!(db.sales().count().await.unwrap(), 2);

        let now = Utc::now();
        let window = db
            .sales()
            .list_between(now - Duration::hours(1), now + Duration::hours(1))
            .await
            .unwrap();
        assert_eq!(window.len(), 2);

        let empty = db
            .sales()
            .list_between(now - Duration::days(2), now - Duration::days(1))
            .await
            .unwrap();
        assert!(empty.is_empty());
    }

    #[tokio::test]
    async fn test_sales_are_immutable() {
        let (db, product) = setup().await;
        let sale = sell(&db, &product, 1).await;

        let update = sqlx::query("UPDATE sales SET total_cents = 0 WHERE id = ?1")
            .bind(&sale.id)
            .execute(db.pool())
            .await;
        assert!(matches!(update.map_err(DbError::from), Err(DbError::QueryFailed(_))));

        let delete = sqlx::query("DELETE FROM sale_lines WHERE sale_id = ?1")
            .bind(&sale.id)
            .execute(db.pool())
            .await;
        assert!(delete.is_err());

        assert_eq!(db.sales().get(&sale.id).await.unwrap(), sale);
    }
}
