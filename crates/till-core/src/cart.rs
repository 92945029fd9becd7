//! # Cart Session
//!
//! The in-progress checkout of one cashier.
//!
//! ## Ownership
//! A `CartSession` belongs to exactly one cashier for one checkout flow and is
//! never shared, so it needs no locking. It is discarded on cancel and cleared
//! once its sale is committed.
//!
//! ## Cart Operations Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Cart Session Operations                              │
//! │                                                                         │
//! │  Cashier Action          Operation              Stock Check (live)      │
//! │  ──────────────          ─────────              ──────────────────      │
//! │                                                                         │
//! │  Scan / click ─────────► add_item(p, n) ──────► stock = 0 → OutOfStock │
//! │                                                 cart+n > stock → Insuf. │
//! │                                                                         │
//! │  Edit quantity ────────► set_quantity(p, n) ──► n > stock → Insuf.     │
//! │                                                 n <= 0 → remove line    │
//! │                                                                         │
//! │  Remove ───────────────► remove_item(id) ─────► (none, idempotent)     │
//! │                                                                         │
//! │  Cancel ───────────────► clear() ─────────────► (none)                 │
//! │                                                                         │
//! │  NOTE: these checks are advisory. The sale recorder repeats them       │
//! │        atomically at commit time.                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Every operation takes the product as just read from the catalog; the cart
//! itself never touches storage.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::types::{Product, SaleLine};
use crate::validation;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Cart Line
// =============================================================================

/// A line in the cart.
///
/// ## Snapshot Pattern
/// Name and unit price are frozen when the product is first added. Later
/// increments keep the original price even if the catalog price changed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartLine {
    product_id: String,
    product_name: String,
    quantity: i64,
    unit_price_cents: i64,
    #[ts(as = "String")]
    added_at: DateTime<Utc>,
}

impl CartLine {
    /// Builds a validated line; rejects non-positive quantity and negative price.
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price_cents: i64,
    ) -> CoreResult<Self> {
        let product_id = product_id.into();
        if product_id.trim().is_empty() {
            return Err(ValidationError::Required {
                field: "product_id".to_string(),
            }
            .into());
        }
        validation::validate_quantity(quantity)?;
        validation::validate_price_cents(unit_price_cents)?;

        Ok(CartLine {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price_cents,
            added_at: Utc::now(),
        })
    }

    /// Creates a line from the live product, freezing its name and price.
    pub fn from_product(product: &Product, quantity: i64) -> CoreResult<Self> {
        CartLine::new(
            product.id.clone(),
            product.name.clone(),
            quantity,
            product.price_cents,
        )
    }

    pub fn product_id(&self) -> &str {
        &self.product_id
    }

    pub fn product_name(&self) -> &str {
        &self.product_name
    }

    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    pub fn added_at(&self) -> DateTime<Utc> {
        self.added_at
    }

    /// `quantity * unit_price`.
    pub fn subtotal(&self) -> Money {
        self.unit_price().multiply_quantity(self.quantity)
    }

    /// Immutable copy for the sale record.
    pub fn to_sale_line(&self) -> CoreResult<SaleLine> {
        SaleLine::new(
            self.product_id.clone(),
            self.product_name.clone(),
            self.quantity,
            self.unit_price_cents,
        )
    }
}

// =============================================================================
// Cart Session
// =============================================================================

/// The shopping cart of one checkout.
///
/// ## Invariants
/// - Lines are unique by `product_id` (adding the same product increments)
/// - Every line has quantity >= 1
/// - A line's quantity never exceeded the product's stock as seen by the
///   last successful mutation of that line
/// - At most `MAX_CART_ITEMS` lines, at most `MAX_ITEM_QUANTITY` per line
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartSession {
    lines: Vec<CartLine>,
    created_at: DateTime<Utc>,
}

impl CartSession {
    /// Creates a new empty cart.
    pub fn new() -> Self {
        CartSession {
            lines: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Adds `quantity` units of `product`, or increases an existing line.
    ///
    /// ## Errors
    /// - `Validation` if `quantity < 1`
    /// - `ProductNotFound` if the product has been retired
    /// - `OutOfStock` if the product has no stock at all
    /// - `InsufficientStock` if in-cart + `quantity` exceeds stock
    /// - `QuantityTooLarge` / `CartTooLarge` for the cart limits
    ///
    /// On error the cart is unchanged.
    pub fn add_item(&mut self, product: &Product, quantity: i64) -> CoreResult<&CartLine> {
        if quantity <= 0 {
            return Err(ValidationError::MustBePositive {
                field: "quantity".to_string(),
            }
            .into());
        }
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        if !product.is_active {
            return Err(CoreError::ProductNotFound(product.id.clone()));
        }
        if product.stock <= 0 {
            return Err(CoreError::OutOfStock {
                product_id: product.id.clone(),
                name: product.name.clone(),
            });
        }

        let position = self.position(&product.id);
        // Lines never exceed MAX_ITEM_QUANTITY, so this cannot overflow.
        let in_cart = position.map(|i| self.lines[i].quantity).unwrap_or(0);
        let requested = in_cart + quantity;

        if requested > product.stock {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                available: product.stock,
                requested,
            });
        }
        if requested > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested,
                max: MAX_ITEM_QUANTITY,
            });
        }

        let index = match position {
            Some(i) => {
                self.lines[i].quantity = requested;
                i
            }
            None => {
                if validation::validate_cart_size(self.lines.len()).is_err() {
                    return Err(CoreError::CartTooLarge {
                        max: MAX_CART_ITEMS,
                    });
                }
                self.lines.push(CartLine::from_product(product, quantity)?);
                self.lines.len() - 1
            }
        };

        Ok(&self.lines[index])
    }

    /// Sets the quantity of an existing line.
    ///
    /// ## Behavior
    /// - `quantity <= 0`: removes the line (no error if absent)
    /// - line absent: `NotInCart`
    /// - `quantity > stock`: `InsufficientStock`, line unchanged
    pub fn set_quantity(&mut self, product: &Product, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            self.remove_item(&product.id);
            return Ok(());
        }

        let index = self
            .position(&product.id)
            .ok_or_else(|| CoreError::NotInCart(product.id.clone()))?;

        if !product.is_active {
            return Err(CoreError::ProductNotFound(product.id.clone()));
        }
        if quantity > product.stock {
            return Err(CoreError::InsufficientStock {
                product_id: product.id.clone(),
                available: product.stock,
                requested: quantity,
            });
        }
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }

        self.lines[index].quantity = quantity;
        Ok(())
    }

    /// Removes a line. Removing an absent product is a no-op.
    ///
    /// Returns whether a line was removed.
    pub fn remove_item(&mut self, product_id: &str) -> bool {
        let before = self.lines.len();
        self.lines.retain(|l| l.product_id != product_id);
        self.lines.len() != before
    }

    /// Empties the cart.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.created_at = Utc::now();
    }

    /// Read-only snapshot of the lines, in insertion order.
    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn line(&self, product_id: &str) -> Option<&CartLine> {
        self.lines.iter().find(|l| l.product_id == product_id)
    }

    /// Sum of line subtotals.
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::subtotal).sum()
    }

    /// Number of distinct lines.
    pub fn item_count(&self) -> usize {
        self.lines.len()
    }

    /// Units across all lines.
    pub fn total_quantity(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Frozen copies of every line, for the sale record.
    pub fn to_sale_lines(&self) -> CoreResult<Vec<SaleLine>> {
        self.lines.iter().map(CartLine::to_sale_line).collect()
    }

    fn position(&self, product_id: &str) -> Option<usize> {
        self.lines.iter().position(|l| l.product_id == product_id)
    }
}

impl Default for CartSession {
    fn default() -> Self {
        Self::new()
    }
}

/// Cart totals summary for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CartTotals {
    pub item_count: usize,
    pub total_quantity: i64,
    pub total_cents: i64,
}

impl From<&CartSession> for CartTotals {
    fn from(cart: &CartSession) -> Self {
        CartTotals {
            item_count: cart.item_count(),
            total_quantity: cart.total_quantity(),
            total_cents: cart.total().cents(),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn test_product(id: &str, price_cents: i64, stock: i64) -> Product {
        Product {
            id: id.to_string(),
            name: format!("Product {}", id),
            category: "Groceries".to_string(),
            price_cents,
            stock,
            barcode: format!("890{}", id),
            min_stock: 0,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_cart_example_total() {
        let mut cart = CartSession::new();
        let rice = test_product("rice", 125000, 50);
        let oil = test_product("oil", 18000, 30);

        cart.add_item(&rice, 2).unwrap();
        cart.add_item(&oil, 1).unwrap();

        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.total_quantity(), 3);
        assert_eq!(cart.total().to_string(), "2680.00");
    }

    #[test]
    fn test_add_same_product_increments() {
        let mut cart = CartSession::new();
        let product = test_product("1", 999, 10);

        cart.add_item(&product, 2).unwrap();
        let line = cart.add_item(&product, 3).unwrap();

        assert_eq!(line.quantity(), 5);
        assert_eq!(cart.item_count(), 1);
    }

    #[test]
    fn test_add_out_of_stock() {
        let mut cart = CartSession::new();
        let product = test_product("1", 999, 0);

        let err = cart.add_item(&product, 1).unwrap_err();
        assert!(matches!(err, CoreError::OutOfStock { .. }));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_beyond_stock_keeps_cart() {
        let mut cart = CartSession::new();
        let product = test_product("1", 999, 3);

        cart.add_item(&product, 2).unwrap();
        let err = cart.add_item(&product, 2).unwrap_err();

        assert_eq!(
            err,
            CoreError::InsufficientStock {
                product_id: "1".to_string(),
                available: 3,
                requested: 4,
            }
        );
        assert_eq!(cart.line("1").unwrap().quantity(), 2);
    }

    #[test]
    fn test_add_rejects_non_positive_quantity() {
        let mut cart = CartSession::new();
        let product = test_product("1", 999, 3);

        assert!(matches!(
            cart.add_item(&product, 0),
            Err(CoreError::Validation(_))
        ));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_add_retired_product() {
        let mut cart = CartSession::new();
        let mut product = test_product("1", 999, 3);
        product.is_active = false;

        assert!(matches!(
            cart.add_item(&product, 1),
            Err(CoreError::ProductNotFound(_))
        ));
    }

    #[test]
    fn test_price_not_resnapshotted_on_increment() {
        let mut cart = CartSession::new();
        let mut product = test_product("1", 1000, 10);

        cart.add_item(&product, 1).unwrap();
        product.price_cents = 2000;
        product.name = "Renamed".to_string();
        cart.add_item(&product, 1).unwrap();

        let line = cart.line("1").unwrap();
        assert_eq!(line.unit_price().cents(), 1000);
        assert_eq!(line.product_name(), "Product 1");
        assert_eq!(cart.total().cents(), 2000);
    }

    #[test]
    fn test_set_quantity() {
        let mut cart = CartSession::new();
        let product = test_product("1", 500, 5);
        cart.add_item(&product, 1).unwrap();

        cart.set_quantity(&product, 5).unwrap();
        assert_eq!(cart.line("1").unwrap().quantity(), 5);

        let err = cart.set_quantity(&product, 6).unwrap_err();
        assert!(matches!(err, CoreError::InsufficientStock { .. }));
        assert_eq!(cart.line("1").unwrap().quantity(), 5);

        cart.set_quantity(&product, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_set_quantity_on_absent_line() {
        let mut cart = CartSession::new();
        let product = test_product("1", 500, 5);

        assert!(matches!(
            cart.set_quantity(&product, 2),
            Err(CoreError::NotInCart(_))
        ));
        assert!(cart.set_quantity(&product, -1).is_ok());
    }

    #[test]
    fn test_remove_item_is_idempotent() {
        let mut cart = CartSession::new();
        let product = test_product("1", 500, 5);
        cart.add_item(&product, 1).unwrap();

        assert!(cart.remove_item("1"));
        assert!(!cart.remove_item("1"));
        assert!(!cart.remove_item("never-added"));
        assert!(cart.is_empty());
    }

    #[test]
    fn test_cart_limits() {
        let mut cart = CartSession::new();
        let bulk = test_product("bulk", 100, 5000);
        assert!(matches!(
            cart.add_item(&bulk, 1000),
            Err(CoreError::QuantityTooLarge { .. })
        ));

        for i in 0..MAX_CART_ITEMS {
            cart.add_item(&test_product(&i.to_string(), 100, 1), 1)
                .unwrap();
        }
        assert!(matches!(
            cart.add_item(&test_product("extra", 100, 1), 1),
            Err(CoreError::CartTooLarge { .. })
        ));
    }

    #[test]
    fn test_add_rejects_price_above_limit() {
        let mut cart = CartSession::new();
        let product = test_product("1", i64::MAX / 2 + 1, 5);

        assert!(matches!(
            cart.add_item(&product, 2),
            Err(CoreError::Validation(ValidationError::OutOfRange { .. }))
        ));
        assert!(cart.is_empty());
        assert_eq!(cart.total(), Money::zero());
    }

    #[test]
    fn test_add_huge_quantity_to_existing_line() {
        let mut cart = CartSession::new();
        let product = test_product("1", 500, 5);
        cart.add_item(&product, 1).unwrap();

        assert_eq!(
            cart.add_item(&product, i64::MAX).unwrap_err(),
            CoreError::QuantityTooLarge {
                requested: i64::MAX,
                max: MAX_ITEM_QUANTITY,
            }
        );
        assert_eq!(cart.line("1").unwrap().quantity(), 1);
    }

    /// Drives a long pseudo-random sequence of edits against changing stock
    /// and checks each line against the stock its last successful edit saw.
    #[test]
    fn test_line_quantity_never_exceeds_stock_seen() {
        let mut cart = CartSession::new();
        let mut products: Vec<Product> = (0..4)
            .map(|i| test_product(&format!("p{}", i), 100, 3))
            .collect();
        let mut stock_seen = std::collections::HashMap::new();

        let mut seed: u64 = 0x2545_F491_4F6C_DD1D;
        let mut next = || {
            seed ^= seed << 13;
            seed ^= seed >> 7;
            seed ^= seed << 17;
            seed
        };

        for _ in 0..2000 {
            let p = (next() % 4) as usize;
            products[p].stock = (next() % 6) as i64;
            let qty = (next() % 5) as i64 - 1;
            let product = products[p].clone();

            let ok = if next() % 2 == 0 {
                cart.add_item(&product, qty).is_ok()
            } else {
                cart.set_quantity(&product, qty).is_ok()
            };
            if ok {
                stock_seen.insert(product.id.clone(), product.stock);
            }

            for line in cart.lines() {
                assert!(line.quantity() >= 1);
                assert!(line.quantity() <= stock_seen[line.product_id()]);
            }
        }
    }

    #[test]
    fn test_to_sale_lines_copies_snapshots() {
        let mut cart = CartSession::new();
        cart.add_item(&test_product("rice", 125000, 50), 2).unwrap();

        let lines = cart.to_sale_lines().unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].subtotal_cents, 250000);
        assert_eq!(CartTotals::from(&cart).total_cents, 250000);
    }
}
