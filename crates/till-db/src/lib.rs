//! # till-db: Database Layer for Till POS
//!
//! SQLite storage for the catalog and the sale collection, via sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Till POS Data Flow                               │
//! │                                                                         │
//! │  Caller (till-admin CLI, web handler)                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     till-db (THIS CRATE)                        │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐  ┌────────────────┐  ┌─────────────────┐   │   │
//! │  │   │   Database    │  │ CheckoutSession│  │   Migrations    │   │   │
//! │  │   │   (pool.rs)   │  │  (checkout.rs) │  │   (embedded)    │   │   │
//! │  │   └──────┬────────┘  └───────┬────────┘  └─────────────────┘   │   │
//! │  │          │                   │                                  │   │
//! │  │   ┌──────▼────────┐  ┌───────▼────────┐  ┌─────────────────┐   │   │
//! │  │   │ ProductRepo   │◄─┤  SaleRecorder  ├─►│   SaleRepo      │   │   │
//! │  │   │ catalog store │  │ (recorder.rs)  │  │   read side     │   │   │
//! │  │   └───────────────┘  └────────────────┘  └─────────────────┘   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite (WAL) ── products, sales, sale_lines                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Catalog store and sale collection
//! - [`recorder`] - Transactional sale commits
//! - [`checkout`] - Per-cashier cart sessions over live stock
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_db::{Database, DbConfig};
//! use till_core::{Money, Tender};
//!
//! let db = Database::new(DbConfig::new("till.db")).await?;
//!
//! let mut checkout = db.checkout(cashier);
//! checkout.add_item(&rice_id, 2).await?;
//! checkout.add_item(&oil_id, 1).await?;
//! let sale = checkout.commit(&Tender::cash(Money::from_major_minor(3000, 0))).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod checkout;
pub mod error;
pub mod migrations;
pub mod pool;
pub mod recorder;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use checkout::CheckoutSession;
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use recorder::SaleRecorder;

pub use repository::product::ProductRepository;
pub use repository::sale::SaleRepository;
