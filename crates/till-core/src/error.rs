//! # Error Types
//!
//! Domain-specific error types for till-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  till-core errors (this file)                                          │
//! │  ├── CoreError        - Business rule violations                       │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  till-db errors (separate crate)                                       │
//! │  └── DbError          - Storage failures, wraps CoreError              │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → caller                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Recoverability
//! Cart-edit errors (`OutOfStock`, `InsufficientStock`, `NotInCart`) are
//! advisory: the cart keeps its previous state and the cashier can carry on.
//! Commit errors abort the whole sale; the cart is preserved for correction.

use thiserror::Error;

// =============================================================================
// Core Error
// =============================================================================

/// Core business logic errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum CoreError {
    /// Product id is unknown or the product has been retired.
    #[error("Product not found: {0}")]
    ProductNotFound(String),

    /// Product has no stock at all at add time.
    #[error("{name} is out of stock")]
    OutOfStock { product_id: String, name: String },

    /// Requested quantity exceeds live stock.
    ///
    /// ## When This Occurs
    /// - Cart edit: in-cart quantity + requested > current stock (advisory)
    /// - Commit: authoritative re-check under the write lock
    ///
    /// ```text
    /// Add to Cart (qty: 5)
    ///      │
    ///      ▼
    /// Check stock: available=3
    ///      │
    ///      ▼
    /// InsufficientStock { product_id, available: 3, requested: 5 }
    /// ```
    #[error("Insufficient stock for {product_id}: available {available}, requested {requested}")]
    InsufficientStock {
        product_id: String,
        available: i64,
        requested: i64,
    },

    /// Commit attempted with no lines.
    #[error("Cart is empty")]
    EmptyCart,

    /// A stock adjustment would take stock below zero.
    ///
    /// Inside a sale commit this should be unreachable; seeing it there means
    /// the stock checks and the decrement disagree.
    #[error("Stock for {product_id} would go negative: stock {stock}, delta {delta}")]
    WouldGoNegative {
        product_id: String,
        stock: i64,
        delta: i64,
    },

    /// Quantity change targeted a product that is not in the cart.
    #[error("Product {0} is not in the cart")]
    NotInCart(String),

    /// Sale id or receipt number is unknown.
    #[error("Sale not found: {0}")]
    SaleNotFound(String),

    /// Principal lacks the permission for this action.
    #[error("{principal} is not allowed to {action}")]
    Forbidden { principal: String, action: String },

    /// Cash tendered does not cover the total.
    #[error("Insufficient payment: total {total_cents}, tendered {tendered_cents}")]
    InsufficientPayment {
        total_cents: i64,
        tendered_cents: i64,
    },

    /// Non-cash tender is missing required details.
    #[error("Invalid tender: {reason}")]
    InvalidTender { reason: String },

    /// Cart has exceeded maximum allowed lines.
    #[error("Cart cannot have more than {max} items")]
    CartTooLarge { max: usize },

    /// Item quantity exceeds maximum allowed.
    #[error("Quantity {requested} exceeds maximum allowed ({max})")]
    QuantityTooLarge { requested: i64, max: i64 },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

impl CoreError {
    /// Returns the product this error is about, when there is one.
    ///
    /// Lets the caller highlight the offending cart line.
    pub fn product_id(&self) -> Option<&str> {
        match self {
            CoreError::ProductNotFound(id)
            | CoreError::NotInCart(id)
            | CoreError::OutOfStock { product_id: id, .. }
            | CoreError::InsufficientStock { product_id: id, .. }
            | CoreError::WouldGoNegative { product_id: id, .. } => Some(id),
            _ => None,
        }
    }
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Value must be positive.
    #[error("{field} must be positive")]
    MustBePositive { field: String },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: String },

    /// Invalid format (e.g., invalid UUID, non-digit barcode).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },
}

impl ValidationError {
    pub(crate) fn required(field: &str) -> Self {
        ValidationError::Required {
            field: field.to_string(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================
