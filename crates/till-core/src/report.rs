//! # Reporting
//!
//! Read-side projections over sales and the catalog. Nothing here holds
//! state: every report is recomputed from the slices it is given.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  &[Sale] ────┬──► daily_revenue / daily_window  (per reporting day)     │
//! │              ├──► top_products                  (revenue desc, id asc)  │
//! │              └──► sales_summary                                          │
//! │                                                                         │
//! │  &[Product] ─┬──► category_values               (price × stock)         │
//! │              ├──► low_stock                     (stock <= min_stock)    │
//! │              └──► inventory_summary                                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Days are calendar days in a fixed reporting offset, never the server's
//! local zone.

use std::collections::{BTreeMap, HashMap};

use chrono::{Duration, FixedOffset, NaiveDate};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;
use crate::types::{Product, Sale};

// =============================================================================
// Sales Reports
// =============================================================================

/// Revenue and transaction count for one reporting day.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct DailyRevenue {
    #[ts(as = "String")]
    pub date: NaiveDate,
    pub revenue_cents: i64,
    pub transactions: usize,
}

/// Groups sales by calendar day of their timestamp in `offset`.
///
/// Only days with at least one sale appear, in ascending date order.
pub fn daily_revenue(sales: &[Sale], offset: FixedOffset) -> Vec<DailyRevenue> {
    let mut days: BTreeMap<NaiveDate, (Money, usize)> = BTreeMap::new();

    for sale in sales {
        let day = sale.created_at.with_timezone(&offset).date_naive();
        let entry = days.entry(day).or_insert((Money::zero(), 0));
        entry.0 += sale.total();
        entry.1 += 1;
    }

    days.into_iter()
        .map(|(date, (revenue, transactions))| DailyRevenue {
            date,
            revenue_cents: revenue.cents(),
            transactions,
        })
        .collect()
}

/// The `days` reporting days ending at `end`, zero-filled, oldest first.
///
/// Backs the dashboard's "last 7 days" chart.
pub fn daily_window(
    sales: &[Sale],
    offset: FixedOffset,
    end: NaiveDate,
    days: u32,
) -> Vec<DailyRevenue> {
    let by_day: HashMap<NaiveDate, DailyRevenue> = daily_revenue(sales, offset)
        .into_iter()
        .map(|d| (d.date, d))
        .collect();

    (0..days)
        .rev()
        .map(|back| {
            let date = end - Duration::days(i64::from(back));
            by_day.get(&date).cloned().unwrap_or(DailyRevenue {
                date,
                revenue_cents: 0,
                transactions: 0,
            })
        })
        .collect()
}

/// Units and revenue sold for one product across sales.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ProductSales {
    pub product_id: String,
    /// Name snapshot from the first sale line seen for this product.
    pub product_name: String,
    pub quantity: i64,
    pub revenue_cents: i64,
}

/// Top `n` products by revenue, ties broken by product id ascending.
///
/// With `n` at least the number of distinct products sold, the revenues sum
/// to the total recorded revenue.
pub fn top_products(sales: &[Sale], n: usize) -> Vec<ProductSales> {
    let mut by_product: HashMap<&str, ProductSales> = HashMap::new();

    for line in sales.iter().flat_map(|s| s.items.iter()) {
        let entry = by_product
            .entry(line.product_id.as_str())
            .or_insert_with(|| ProductSales {
                product_id: line.product_id.clone(),
                product_name: line.product_name.clone(),
                quantity: 0,
                revenue_cents: 0,
            });
        entry.quantity += line.quantity;
        entry.revenue_cents += line.subtotal_cents;
    }

    let mut ranked: Vec<ProductSales> = by_product.into_values().collect();
    ranked.sort_by(|a, b| {
        b.revenue_cents
            .cmp(&a.revenue_cents)
            .then_with(|| a.product_id.cmp(&b.product_id))
    });
    ranked.truncate(n);
    ranked
}

/// Headline sales figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SalesSummary {
    pub total_revenue_cents: i64,
    pub transactions: usize,
    pub average_transaction_cents: i64,
    pub units_sold: i64,
}

pub fn sales_summary(sales: &[Sale]) -> SalesSummary {
    let revenue: Money = sales.iter().map(Sale::total).sum();

    SalesSummary {
        total_revenue_cents: revenue.cents(),
        transactions: sales.len(),
        average_transaction_cents: revenue.average_over(sales.len()).cents(),
        units_sold: sales.iter().map(Sale::item_count).sum(),
    }
}

// =============================================================================
// Inventory Reports
// =============================================================================

/// Inventory value of one category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CategoryValue {
    pub category: String,
    pub value_cents: i64,
    pub products: usize,
}

/// Sum of `price * stock` per category, ordered by category name.
pub fn category_values(products: &[Product]) -> Vec<CategoryValue> {
    let mut categories: BTreeMap<&str, (Money, usize)> = BTreeMap::new();

    for product in products {
        let entry = categories
            .entry(product.category.as_str())
            .or_insert((Money::zero(), 0));
        entry.0 += product.stock_value();
        entry.1 += 1;
    }

    categories
        .into_iter()
        .map(|(category, (value, products))| CategoryValue {
            category: category.to_string(),
            value_cents: value.cents(),
            products,
        })
        .collect()
}

/// Products at or below their advisory threshold, lowest stock first.
pub fn low_stock(products: &[Product]) -> Vec<Product> {
    let mut low: Vec<Product> = products
        .iter()
        .filter(|p| p.is_low_stock())
        .cloned()
        .collect();
    low.sort_by(|a, b| a.stock.cmp(&b.stock).then_with(|| a.id.cmp(&b.id)));
    low
}

/// Stock band used by the inventory screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum StockLevel {
    /// `stock <= min_stock`
    Low,
    /// `stock <= 2 * min_stock`
    Normal,
    High,
}

pub fn stock_level(product: &Product) -> StockLevel {
    if product.stock <= product.min_stock {
        StockLevel::Low
    } else if product.stock <= product.min_stock.saturating_mul(2) {
        StockLevel::Normal
    } else {
        StockLevel::High
    }
}

/// Headline inventory figures.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InventorySummary {
    pub total_value_cents: i64,
    pub total_units: i64,
    pub products: usize,
    pub low: usize,
    pub normal: usize,
    pub high: usize,
}

pub fn inventory_summary(products: &[Product]) -> InventorySummary {
    let mut summary = InventorySummary {
        total_value_cents: 0,
        total_units: 0,
        products: products.len(),
        low: 0,
        normal: 0,
        high: 0,
    };

    for product in products {
        summary.total_value_cents = summary
            .total_value_cents
            .saturating_add(product.stock_value().cents());
        summary.total_units = summary.total_units.saturating_add(product.stock);
        match stock_level(product) {
            StockLevel::Low => summary.low += 1,
            StockLevel::Normal => summary.normal += 1,
            StockLevel::High => summary.high += 1,
        }
    }

    summary
}

// =============================================================================
// Unit Tests
// =============================================================================
