//! # till-core: Pure Business Logic for Till POS
//!
//! Everything a checkout needs to decide, with zero I/O. Storage lives in
//! `till-db`; this crate only ever sees values the caller already loaded.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                Presentation (web / CLI)                         │   │
//! │  │    Catalog ──► Cart ──► Tender ──► Receipt ──► Reports          │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ till-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌───────────┐  │   │
//! │  │   │   types   │  │   cart    │  │  tender   │  │  report   │  │   │
//! │  │   │  Product  │  │CartSession│  │  Payment  │  │ daily/top │  │   │
//! │  │   │   Sale    │  │ CartLine  │  │  change   │  │ low stock │  │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └───────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS           │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                    till-db (Database Layer)                     │   │
//! │  │        Catalog store, sale recorder, checkout sessions          │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Product, Sale, SaleLine, Principal, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`cart`] - The per-cashier cart session
//! - [`tender`] - Settling a payment against a cart total
//! - [`report`] - Read-only projections over sales and the catalog
//! - [`error`] - Domain error types
//! - [`validation`] - Input validation
//!
//! ## Example Usage
//!
//! ```rust
//! use till_core::money::Money;
//!
//! let rice = Money::from_major_minor(1250, 0);
//! let oil = Money::from_major_minor(180, 0);
//!
//! let total = rice * 2i64 + oil;
//! assert_eq!(total.to_string(), "2680.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod error;
pub mod money;
pub mod report;
pub mod tender;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{CartLine, CartSession};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use tender::Tender;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines allowed in a single cart.
///
/// ## Business Reason
/// Prevents runaway carts and keeps a receipt printable.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity of a single product in a cart.
///
/// ## Business Reason
/// Catches fat-finger entries (typing 1000 instead of 10).
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Highest unit price a product may carry, in cents (100,000,000.00).
///
/// A full cart at this price still fits comfortably in an `i64` total.
pub const MAX_PRICE_CENTS: i64 = 10_000_000_000;

/// Prefix of every receipt number.
pub const RECEIPT_PREFIX: &str = "RCP";
