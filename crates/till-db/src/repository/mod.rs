//! # Repository Module
//!
//! Storage access behind a small API per collection.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  ProductRepository (catalog store)      SaleRepository (read side)      │
//! │  ├── get / list / search                ├── get / get_by_receipt        │
//! │  ├── adjust_stock   (atomic per key)    ├── list / list_between         │
//! │  └── create / update / restock / retire └── count                       │
//! │                 │                                 ▲                     │
//! │                 │ apply_stock_delta               │ load_sale           │
//! │                 ▼                                 │                     │
//! │             SaleRecorder (one transaction per commit, writes sales)     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalog store
//! - [`SaleRepository`](sale::SaleRepository) - Committed sales

pub mod product;
pub mod sale;
