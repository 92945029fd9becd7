//! # Checkout Session
//!
//! One cashier's cart, checked against live stock on every edit and
//! committed through the [`SaleRecorder`].
//!
//! ```text
//! add_item(id, 2) ──► products.get(id) ──► CartSession::add_item(&product, 2)
//! set_quantity(id, n) ─────────────────► CartSession::set_quantity(&product, n)
//! commit(tender) ──► SaleRecorder::commit(cart, tender, principal, attempt_id)
//!                      ok  ──► cart cleared, new attempt_id
//!                      err ──► cart and attempt_id kept for a retry
//! ```
//!
//! Stock checks during editing are advisory; the commit re-checks under the
//! write lock.

use tracing::debug;
use uuid::Uuid;

use crate::error::DbResult;
use crate::recorder::SaleRecorder;
use crate::repository::product::ProductRepository;
use till_core::cart::CartTotals;
use till_core::{CartLine, CartSession, CoreError, Money, Principal, Sale, Tender};

/// A cart session bound to a principal and the live catalog.
#[derive(Debug)]
pub struct CheckoutSession {
    products: ProductRepository,
    recorder: SaleRecorder,
    principal: Principal,
    cart: CartSession,
    attempt_id: String,
}

impl CheckoutSession {
    pub fn new(products: ProductRepository, recorder: SaleRecorder, principal: Principal) -> Self {
        CheckoutSession {
            products,
            recorder,
            principal,
            cart: CartSession::new(),
            attempt_id: Uuid::new_v4().to_string(),
        }
    }

    /// Adds `quantity` units of a product, reading its live stock first.
    ///
    /// ## Errors
    /// `ProductNotFound`, `OutOfStock`, `InsufficientStock`, `Validation`,
    /// `QuantityTooLarge`, `CartTooLarge`. The cart is unchanged on error.
    pub async fn add_item(&mut self, product_id: &str, quantity: i64) -> DbResult<CartLine> {
        let product = self.products.get(product_id).await?;
        let line = self.cart.add_item(&product, quantity)?.clone();

        debug!(
            product_id = %product_id,
            quantity = line.quantity(),
            lines = self.cart.item_count(),
            "Cart item added"
        );
        Ok(line)
    }

    /// Sets a line's quantity; zero or less removes it.
    ///
    /// ## Errors
    /// `NotInCart` when the product has no line, plus the stock errors of
    /// [`add_item`](Self::add_item).
    pub async fn set_quantity(&mut self, product_id: &str, quantity: i64) -> DbResult<()> {
        if quantity <= 0 {
            self.remove_item(product_id);
            return Ok(());
        }

        if self.cart.line(product_id).is_none() {
            return Err(CoreError::NotInCart(product_id.to_string()).into());
        }

        let product = self.products.get(product_id).await?;
        self.cart.set_quantity(&product, quantity)?;

        debug!(product_id = %product_id, quantity, "Cart quantity set");
        Ok(())
    }

    /// Removes a line. Returns whether one was there.
    pub fn remove_item(&mut self, product_id: &str) -> bool {
        let removed = self.cart.remove_item(product_id);
        if removed {
            debug!(product_id = %product_id, "Cart item removed");
        }
        removed
    }

    /// Empties the cart and starts a new attempt.
    pub fn clear(&mut self) {
        self.cart.clear();
        self.attempt_id = Uuid::new_v4().to_string();
    }

    pub fn total(&self) -> Money {
        self.cart.total()
    }

    pub fn totals(&self) -> CartTotals {
        CartTotals::from(&self.cart)
    }

    pub fn lines(&self) -> &[CartLine] {
        self.cart.lines()
    }

    pub fn cart(&self) -> &CartSession {
        &self.cart
    }

    pub fn principal(&self) -> &Principal {
        &self.principal
    }

    /// Idempotency key the next commit will use.
    pub fn attempt_id(&self) -> &str {
        &self.attempt_id
    }

    /// Commits the cart as a sale.
    ///
    /// On success the cart is cleared and a fresh attempt id is drawn. On
    /// failure both are kept, so calling `commit` again after a storage error
    /// cannot record the sale twice.
    pub async fn commit(&mut self, tender: &Tender) -> DbResult<Sale> {
        let sale = self
            .recorder
            .commit(&self.cart, tender, &self.principal, &self.attempt_id)
            .await?;

        self.clear();
        Ok(sale)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
