//! # Domain Types
//!
//! Core domain types used throughout Till POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │      Sale       │   │    Payment      │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  method         │       │
//! │  │  price_cents    │   │  receipt_number │   │  tendered       │       │
//! │  │  stock          │   │  items (lines)  │   │  change         │       │
//! │  │  min_stock      │   │  total_cents    │   │  reference      │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │    SaleLine     │   │   Principal     │                             │
//! │  │  (frozen copy   │   │  id, name, role │                             │
//! │  │   of CartLine)  │   │  Admin/Cashier  │                             │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Lifecycle
//! - Product: created by catalog management, mutated only by stock
//!   adjustments and sale commits, never deleted (retired instead).
//! - Sale: created once by the sale recorder, never mutated afterwards.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation;

// =============================================================================
// Product
// =============================================================================

/// A product in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    /// Opaque identifier (UUID v4).
    pub id: String,

    /// Display name shown to cashier and on receipt.
    pub name: String,

    /// Category used for grouping and inventory value reports.
    pub category: String,

    /// Price in cents (smallest currency unit). Never negative.
    pub price_cents: i64,

    /// Units on hand. Never negative.
    pub stock: i64,

    /// Barcode (EAN-13 or store code).
    pub barcode: String,

    /// Advisory low-stock threshold, not an enforced floor.
    pub min_stock: i64,

    /// False once retired (soft removal).
    pub is_active: bool,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,

    /// Bumped on every write, used for compare-and-set updates.
    pub version: i64,
}

impl Product {
    /// Returns the price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Stock value at current price.
    #[inline]
    pub fn stock_value(&self) -> Money {
        self.price().multiply_quantity(self.stock)
    }

    /// Advisory alert condition: `stock <= min_stock`.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }

    /// Checks whether `quantity` units could be sold right now.
    pub fn can_sell(&self, quantity: i64) -> bool {
        self.is_active && quantity > 0 && self.stock >= quantity
    }
}

/// Input for creating a catalog product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    pub category: String,
    pub price_cents: i64,
    pub stock: i64,
    pub barcode: String,
    pub min_stock: i64,
}

impl NewProduct {
    /// Validates every field.
    pub fn validate(&self) -> Result<(), ValidationError> {
        validation::validate_product_name(&self.name)?;
        validation::validate_category(&self.category)?;
        validation::validate_price_cents(self.price_cents)?;
        validation::validate_non_negative("stock", self.stock)?;
        validation::validate_barcode(&self.barcode)?;
        validation::validate_non_negative("min_stock", self.min_stock)?;
        Ok(())
    }
}

/// Merge-patch for an existing product.
///
/// Stock is deliberately absent: it only moves through stock adjustments
/// and sale commits.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductUpdate {
    pub name: Option<String>,
    pub category: Option<String>,
    pub price_cents: Option<i64>,
    pub barcode: Option<String>,
    pub min_stock: Option<i64>,
}

impl ProductUpdate {
    /// Applies the patch to `product`, validating each provided field.
    pub fn apply(&self, product: &mut Product) -> Result<(), ValidationError> {
        if let Some(name) = &self.name {
            validation::validate_product_name(name)?;
            product.name = name.trim().to_string();
        }
        if let Some(category) = &self.category {
            validation::validate_category(category)?;
            product.category = category.trim().to_string();
        }
        if let Some(price_cents) = self.price_cents {
            validation::validate_price_cents(price_cents)?;
            product.price_cents = price_cents;
        }
        if let Some(barcode) = &self.barcode {
            validation::validate_barcode(barcode)?;
            product.barcode = barcode.trim().to_string();
        }
        if let Some(min_stock) = self.min_stock {
            validation::validate_non_negative("min_stock", min_stock)?;
            product.min_stock = min_stock;
        }
        Ok(())
    }

    /// True when the patch changes nothing.
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.category.is_none()
            && self.price_cents.is_none()
            && self.barcode.is_none()
            && self.min_stock.is_none()
    }
}

// =============================================================================
// Payment
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    /// Physical cash payment.
    Cash,
    /// GCash e-wallet transfer.
    GCash,
    /// Card payment on an external terminal.
    Card,
}

impl PaymentMethod {
    /// Label printed on receipts.
    pub fn label(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "Cash",
            PaymentMethod::GCash => "GCash",
            PaymentMethod::Card => "Card",
        }
    }
}

/// How a sale was paid, as settled at commit time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Payment {
    pub method: PaymentMethod,
    /// Cash handed over by the customer.
    pub tendered_cents: Option<i64>,
    /// Cash returned to the customer.
    pub change_cents: Option<i64>,
    /// GCash "number/reference" or masked card number.
    pub reference: Option<String>,
}

// =============================================================================
// Sale
// =============================================================================

/// A committed line of a sale.
///
/// Frozen copy of a cart line: name and unit price are what the cashier saw,
/// regardless of later catalog edits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SaleLine {
    pub product_id: String,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl SaleLine {
    /// Builds a validated line; rejects non-positive quantity and negative price.
    pub fn new(
        product_id: impl Into<String>,
        product_name: impl Into<String>,
        quantity: i64,
        unit_price_cents: i64,
    ) -> CoreResult<Self> {
        let product_id = product_id.into();
        if product_id.trim().is_empty() {
            return Err(ValidationError::required("product_id").into());
        }
        validation::validate_quantity(quantity)?;
        validation::validate_price_cents(unit_price_cents)?;

        Ok(SaleLine {
            product_id,
            product_name: product_name.into(),
            quantity,
            unit_price_cents,
            subtotal_cents: unit_price_cents * quantity,
        })
    }

    #[inline]
    pub fn unit_price(&self) -> Money {
        Money::from_cents(self.unit_price_cents)
    }

    #[inline]
    pub fn subtotal(&self) -> Money {
        Money::from_cents(self.subtotal_cents)
    }
}

/// An immutable, committed sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Sale {
    pub id: String,
    /// Unique human-facing identifier, e.g. `RCP-20260131093015123-4f2a`.
    pub receipt_number: String,
    /// Client-supplied idempotency key of the commit that created this sale.
    pub attempt_id: String,
    pub items: Vec<SaleLine>,
    pub total_cents: i64,
    pub payment: Payment,
    pub cashier_id: String,
    pub cashier_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Sale {
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }

    /// Units sold across all lines.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

// =============================================================================
// Identity
// =============================================================================

/// Role granted by the identity provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Cashier,
}

/// Actions guarded by role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Permission {
    RecordSale,
    EditCatalog,
    ViewReports,
}

impl Permission {
    fn describe(&self) -> &'static str {
        match self {
            Permission::RecordSale => "record a sale",
            Permission::EditCatalog => "edit the catalog",
            Permission::ViewReports => "view reports",
        }
    }
}

/// An authenticated principal, as handed over by the identity provider.
///
/// Provider tokens never reach this crate; only the resolved identity does.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Principal {
    pub id: String,
    pub name: String,
    pub role: Role,
}

impl Principal {
    pub fn new(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Principal {
            id: id.into(),
            name: name.into(),
            role,
        }
    }

    pub fn can(&self, permission: Permission) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Cashier => matches!(permission, Permission::RecordSale),
        }
    }

    /// Returns `Forbidden` unless the principal holds `permission`.
    pub fn authorize(&self, permission: Permission) -> CoreResult<()> {
        if self.can(permission) {
            Ok(())
        } else {
            Err(CoreError::Forbidden {
                principal: self.name.clone(),
                action: permission.describe().to_string(),
            })
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn product(stock: i64, min_stock: i64) -> Product {
        Product {
            id: "p1".to_string(),
            name: "Sugar 1kg".to_string(),
            category: "Groceries".to_string(),
            price_cents: 6500,
            stock,
            barcode: "8901234567892".to_string(),
            min_stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn test_low_stock_is_inclusive() {
        assert!(product(10, 10).is_low_stock());
        assert!(!product(11, 10).is_low_stock());
        assert_eq!(product(4, 1).stock_value().cents(), 26000);
    }

    #[test]
    fn test_sale_line_rejects_bad_input() {
        assert!(SaleLine::new("p1", "Sugar", 0, 6500).is_err());
        assert!(SaleLine::new("p1", "Sugar", -2, 6500).is_err());
        assert!(SaleLine::new("p1", "Sugar", 1, -1).is_err());
        assert!(SaleLine::new("", "Sugar", 1, 100).is_err());

        let line = SaleLine::new("p1", "Sugar", 3, 6500).unwrap();
        assert_eq!(line.subtotal_cents, 19500);
    }

    #[test]
    fn test_product_update_leaves_stock_alone() {
        let mut p = product(7, 2);
        let patch = ProductUpdate {
            price_cents: Some(7000),
            name: Some("  Sugar 1kg (brown) ".to_string()),
            ..Default::default()
        };
        patch.apply(&mut p).unwrap();
        assert_eq!(p.price_cents, 7000);
        assert_eq!(p.name, "Sugar 1kg (brown)");
        assert_eq!(p.stock, 7);

        let bad = ProductUpdate {
            price_cents: Some(-1),
            ..Default::default()
        };
        assert!(bad.apply(&mut p).is_err());
        assert!(ProductUpdate::default().is_empty());
    }

    #[test]
    fn test_cashier_cannot_edit_catalog() {
        let cashier = Principal::new("u2", "Jars", Role::Cashier);
        assert!(cashier.authorize(Permission::RecordSale).is_ok());
        let err = cashier.authorize(Permission::EditCatalog).unwrap_err();
        assert!(matches!(err, CoreError::Forbidden { .. }));

        let admin = Principal::new("u1", "Erica", Role::Admin);
        assert!(admin.authorize(Permission::EditCatalog).is_ok());
        assert!(admin.authorize(Permission::ViewReports).is_ok());
    }

    #[test]
    fn test_payment_method_serializes_lowercase() {
        let json = serde_json::to_string(&PaymentMethod::GCash).unwrap();
        assert_eq!(json, "\"gcash\"");
    }
}
