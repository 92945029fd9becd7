//! # Sale Recorder
//!
//! Turns a cart into an immutable sale and decrements stock, all or nothing.
//!
//! ## Commit Algorithm
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commit(cart, tender, principal, attempt_id)                            │
//! │                                                                         │
//! │  1. principal may RecordSale?           no  ──► Forbidden               │
//! │  2. cart empty?                         yes ──► EmptyCart               │
//! │  3. tender.settle(cart.total())         err ──► InsufficientPayment /   │
//! │                                                 InvalidTender           │
//! │  ── BEGIN IMMEDIATE (takes the write lock, waits up to busy_timeout) ── │
//! │  4. sale with attempt_id exists?        yes ──► return it (no writes)   │
//! │  5. for each line:                                                      │
//! │        UPDATE stock = stock - qty WHERE stock >= qty AND is_active      │
//! │        no row ──► InsufficientStock / ProductNotFound ──► ROLLBACK      │
//! │  6. receipt RCP-<yyyymmddHHMMSSmmm>-<4 hex>, retry on collision         │
//! │  7. INSERT sale + lines                                                 │
//! │  ── COMMIT ──────────────────────────────────────────────────────────── │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart is only read. Whatever the outcome, the caller still holds it
//! unchanged and can correct it and retry with the same attempt id.

use chrono::{DateTime, SubsecRound, Utc};
use sqlx::pool::PoolConnection;
use sqlx::{Sqlite, SqliteConnection, SqlitePool};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use crate::repository::product::{apply_stock_delta, StockChange};
use crate::repository::sale::{find_by_attempt, insert_sale};
use till_core::validation::validate_uuid;
use till_core::{
    CartSession, CoreError, Payment, Permission, Principal, Sale, SaleLine, Tender,
    RECEIPT_PREFIX,
};

/// Receipt numbers tried before a commit gives up.
const RECEIPT_ATTEMPTS: usize = 5;

/// Builds a receipt number for a sale created at `at`.
///
/// `RCP-20260131093015123-4f2a`: UTC timestamp to the millisecond plus four
/// random hex digits.
pub fn receipt_number(at: DateTime<Utc>) -> String {
    let suffix = Uuid::new_v4().simple().to_string();
    format!(
        "{}-{}-{}",
        RECEIPT_PREFIX,
        at.format("%Y%m%d%H%M%S%3f"),
        &suffix[..4]
    )
}

/// A pooled connection inside `BEGIN IMMEDIATE`.
///
/// If dropped before [`finish`](Self::finish) (the commit future was
/// cancelled) the connection is detached from the pool and closed, which makes
/// SQLite roll the transaction back.
struct WriteLock {
    conn: Option<PoolConnection<Sqlite>>,
}

impl WriteLock {
    async fn acquire(pool: &SqlitePool) -> DbResult<Self> {
        let mut conn = pool.acquire().await?;
        sqlx::query("BEGIN IMMEDIATE")
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        Ok(WriteLock { conn: Some(conn) })
    }

    fn conn(&mut self) -> DbResult<&mut SqliteConnection> {
        self.conn
            .as_deref_mut()
            .ok_or_else(|| DbError::Internal("write lock already released".to_string()))
    }

    async fn finish(mut self, commit: bool) -> DbResult<()> {
        let mut conn = match self.conn.take() {
            Some(conn) => conn,
            None => return Ok(()),
        };

        let statement = if commit { "COMMIT" } else { "ROLLBACK" };
        if let Err(e) = sqlx::query(statement).execute(&mut *conn).await {
            // Never hand a connection with an open transaction back to the pool.
            let _ = conn.detach();
            return Err(DbError::TransactionFailed(e.to_string()));
        }
        Ok(())
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        if let Some(conn) = self.conn.take() {
            let _ = conn.detach();
        }
    }
}

/// Records sales.
///
/// ## Usage
/// ```rust,ignore
/// let sale = db
///     .recorder()
///     .commit(&cart, &Tender::cash(cash), &cashier, &attempt_id)
///     .await?;
/// ```
#[derive(Debug, Clone)]
pub struct SaleRecorder {
    pool: SqlitePool,
}

impl SaleRecorder {
    pub fn new(pool: SqlitePool) -> Self {
        SaleRecorder { pool }
    }

    /// Commits `cart` as one sale.
    ///
    /// `attempt_id` is the idempotency key: a retry with the id of an attempt
    /// that already committed returns that sale and changes nothing.
    ///
    /// ## Errors
    /// - `Domain(Forbidden)`, `Domain(EmptyCart)`
    /// - `Domain(InsufficientPayment)`, `Domain(InvalidTender)`
    /// - `Domain(InsufficientStock)`, `Domain(ProductNotFound)`: nothing was
    ///   written, stock is as before
    /// - storage errors; nothing was written either
    pub async fn commit(
        &self,
        cart: &CartSession,
        tender: &Tender,
        principal: &Principal,
        attempt_id: &str,
    ) -> DbResult<Sale> {
        principal.authorize(Permission::RecordSale)?;

        if cart.is_empty() {
            return Err(CoreError::EmptyCart.into());
        }

        validate_uuid("attempt_id", attempt_id)?;

        let items = cart.to_sale_lines()?;
        let total = cart.total();
        let payment = tender.settle(total)?;

        debug!(
            attempt_id = %attempt_id,
            lines = items.len(),
            total_cents = total.cents(),
            method = payment.method.label(),
            "Committing sale"
        );

        let mut lock = WriteLock::acquire(&self.pool).await?;
        let result = record(lock.conn()?, items, total.cents(), payment, principal, attempt_id).await;

        match result {
            Ok((sale, replayed)) => {
                lock.finish(true).await?;
                if replayed {
                    info!(
                        attempt_id = %attempt_id,
                        receipt = %sale.receipt_number,
                        "Commit retry returned existing sale"
                    );
                } else {
                    info!(
                        sale_id = %sale.id,
                        receipt = %sale.receipt_number,
                        total_cents = sale.total_cents,
                        cashier = %principal.id,
                        "Sale recorded"
                    );
                }
                Ok(sale)
            }
            Err(err) => {
                if let Err(rollback) = lock.finish(false).await {
                    warn!(error = %rollback, "Rollback failed, connection discarded");
                }
                match &err {
                    DbError::Domain(CoreError::WouldGoNegative { product_id, .. }) => {
                        error!(
                            attempt_id = %attempt_id,
                            product_id = %product_id,
                            "Stock went negative inside a commit"
                        );
                    }
                    DbError::Domain(domain) => {
                        warn!(attempt_id = %attempt_id, error = %domain, "Sale rejected");
                    }
                    other => {
                        error!(attempt_id = %attempt_id, error = %other, "Sale commit failed");
                    }
                }
                Err(err)
            }
        }
    }
}

/// The transactional part of a commit. Returns the sale and whether it was a
/// replay of an earlier attempt.
async fn record(
    conn: &mut SqliteConnection,
    items: Vec<SaleLine>,
    total_cents: i64,
    payment: Payment,
    principal: &Principal,
    attempt_id: &str,
) -> DbResult<(Sale, bool)> {
    if let Some(existing) = find_by_attempt(conn, attempt_id).await? {
        return Ok((existing, true));
    }

    for line in &items {
        match apply_stock_delta(conn, &line.product_id, -line.quantity).await? {
            StockChange::Applied(product) => {
                debug!(product_id = %product.id, stock = product.stock, "Stock reserved");
            }
            StockChange::Rejected { stock } => {
                return Err(CoreError::InsufficientStock {
                    product_id: line.product_id.clone(),
                    available: stock,
                    requested: line.quantity,
                }
                .into());
            }
            StockChange::Missing => {
                return Err(CoreError::ProductNotFound(line.product_id.clone()).into());
            }
        }
    }

    let created_at = Utc::now().trunc_subsecs(3);
    let mut sale = Sale {
        id: Uuid::new_v4().to_string(),
        receipt_number: String::new(),
        attempt_id: attempt_id.to_string(),
        items,
        total_cents,
        payment,
        cashier_id: principal.id.clone(),
        cashier_name: principal.name.clone(),
        created_at,
    };

    for attempt in 1..=RECEIPT_ATTEMPTS {
        sale.receipt_number = receipt_number(created_at);
        match insert_sale(conn, &sale).await {
            Ok(()) => return Ok((sale, false)),
            Err(e) if e.is_unique_violation_on("receipt_number") => {
                warn!(receipt = %sale.receipt_number, attempt, "Receipt number collision");
            }
            Err(e) => return Err(e),
        }
    }

    Err(DbError::TransactionFailed(
        "could not allocate a unique receipt number".to_string(),
    ))
}

// =============================================================================
// Unit Tests
// =============================================================================
