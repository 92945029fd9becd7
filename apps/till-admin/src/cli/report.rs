use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::Serialize;
use till_core::report::{
    category_values, daily_window, inventory_summary, low_stock, sales_summary, top_products,
    CategoryValue, DailyRevenue, InventorySummary, ProductSales, SalesSummary,
};
use till_core::{Money, Permission, Product, Sale};
use till_db::Database;

use super::operator;
use crate::config::TillConfig;

#[derive(Debug, Args)]
pub(crate) struct ReportArgs {
    /// Print the report as JSON
    #[arg(long)]
    pub(super) json: bool,
}

/// Everything the admin dashboard shows, in one document.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct Report {
    store_name: String,
    generated_at: DateTime<Utc>,
    report_utc_offset_minutes: i32,
    sales: SalesSummary,
    daily: Vec<DailyRevenue>,
    top_products: Vec<ProductSales>,
    inventory: InventorySummary,
    categories: Vec<CategoryValue>,
    low_stock: Vec<Product>,
}

pub(super) async fn run(args: ReportArgs, db: &Database, config: &TillConfig) -> anyhow::Result<()> {
    operator().authorize(Permission::ViewReports)?;

    let sales = db.sales().list().await.context("failed to load sales")?;
    let products = db.products().list().await.context("failed to load products")?;
    let report = build_report(config, &sales, &products, Utc::now())?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render(&report, &config.currency_symbol));
    }
    Ok(())
}

fn build_report(
    config: &TillConfig,
    sales: &[Sale],
    products: &[Product],
    now: DateTime<Utc>,
) -> anyhow::Result<Report> {
    let offset = config.report_offset()?;
    let today = now.with_timezone(&offset).date_naive();

    Ok(Report {
        store_name: config.store_name.clone(),
        generated_at: now,
        report_utc_offset_minutes: config.report_utc_offset_minutes,
        sales: sales_summary(sales),
        daily: daily_window(sales, offset, today, config.report_days),
        top_products: top_products(sales, config.top_products_limit),
        inventory: inventory_summary(products),
        categories: category_values(products),
        low_stock: low_stock(products),
    })
}

fn render(report: &Report, symbol: &str) -> String {
    let money = |cents: i64| Money::from_cents(cents).format_with(symbol);
    let mut out = String::new();

    out.push_str(&format!(
        "{} report, {}\n\n",
        report.store_name,
        report.generated_at.format("%Y-%m-%d %H:%M UTC")
    ));

    out.push_str("Sales\n");
    out.push_str(&format!("  revenue       {}\n", money(report.sales.total_revenue_cents)));
    out.push_str(&format!("  transactions  {}\n", report.sales.transactions));
    out.push_str(&format!("  average       {}\n", money(report.sales.average_transaction_cents)));
    out.push_str(&format!("  units sold    {}\n\n", report.sales.units_sold));

    out.push_str(&format!("Last {} days\n", report.daily.len()));
    for day in &report.daily {
        out.push_str(&format!(
            "  {}  {:>14}  {:>3} sales\n",
            day.date,
            money(day.revenue_cents),
            day.transactions
        ));
    }

    out.push_str("\nTop products\n");
    if report.top_products.is_empty() {
        out.push_str("  (no sales yet)\n");
    }
    for (rank, product) in report.top_products.iter().enumerate() {
        out.push_str(&format!(
            "  {}. {:<24} {:>14}  {:>4} units\n",
            rank + 1,
            product.product_name,
            money(product.revenue_cents),
            product.quantity
        ));
    }

    out.push_str("\nInventory\n");
    out.push_str(&format!("  value         {}\n", money(report.inventory.total_value_cents)));
    out.push_str(&format!("  units         {}\n", report.inventory.total_units));
    out.push_str(&format!(
        "  levels        {} low, {} normal, {} high\n",
        report.inventory.low, report.inventory.normal, report.inventory.high
    ));
    for category in &report.categories {
        out.push_str(&format!(
            "  {:<12} {:>14}  ({} products)\n",
            category.category,
            money(category.value_cents),
            category.products
        ));
    }

    if !report.low_stock.is_empty() {
        out.push_str("\nLow stock\n");
        for product in &report.low_stock {
            out.push_str(&format!(
                "  {:<24} {:>4} left (min {})\n",
                product.name, product.stock, product.min_stock
            ));
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use till_core::{Payment, PaymentMethod, SaleLine};

    fn config() -> TillConfig {
        TillConfig {
            database_path: "till.db".into(),
            max_connections: 1,
            store_name: "Test Store".to_string(),
            currency_symbol: "₱".to_string(),
            report_utc_offset_minutes: 480,
            top_products_limit: 5,
            report_days: 7,
        }
    }

    fn product(name: &str, price_cents: i64, stock: i64, min_stock: i64) -> Product {
        Product {
            id: name.to_lowercase(),
            name: name.to_string(),
            category: "Groceries".to_string(),
            price_cents,
            stock,
            barcode: "0".to_string(),
            min_stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    fn sale(at: DateTime<Utc>) -> Sale {
        let items = vec![
            SaleLine::new("rice", "Rice 25kg", 2, 125000).unwrap(),
            SaleLine::new("oil", "Cooking Oil 1L", 1, 18000).unwrap(),
        ];
        Sale {
            id: "s1".to_string(),
            receipt_number: "RCP-1".to_string(),
            attempt_id: "a1".to_string(),
            total_cents: 268000,
            items,
            payment: Payment {
                method: PaymentMethod::Cash,
                tendered_cents: Some(300000),
                change_cents: Some(32000),
                reference: None,
            },
            cashier_id: "u2".to_string(),
            cashier_name: "Jars".to_string(),
            created_at: at,
        }
    }

    #[test]
    fn test_report_uses_reporting_day() {
        // 20:00 UTC on the 9th is already the 10th at UTC+8.
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 20, 0, 0).unwrap();
        let sales = vec![sale(now)];
        let products = vec![product("Rice 25kg", 125000, 48, 10), product("Cooking Oil 1L", 18000, 3, 5)];

        let report = build_report(&config(), &sales, &products, now).unwrap();

        assert_eq!(report.daily.len(), 7);
        let last = report.daily.last().unwrap();
        assert_eq!(last.date.to_string(), "2026-03-10");
        assert_eq!(last.revenue_cents, 268000);
        assert_eq!(report.top_products[0].product_id, "rice");
        assert_eq!(report.low_stock.len(), 1);
        assert_eq!(report.inventory.total_units, 51);
    }

    #[test]
    fn test_render_and_json() {
        let now = Utc.with_ymd_and_hms(2026, 3, 9, 8, 0, 0).unwrap();
        let report = build_report(&config(), &[sale(now)], &[product("Sugar 1kg", 6500, 45, 10)], now).unwrap();

        let text = render(&report, "₱");
        assert!(text.contains("revenue       ₱2680.00"));
        assert!(text.contains("1. Rice 25kg"));
        assert!(!text.contains("Low stock"));

        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["sales"]["totalRevenueCents"], 268000);
        assert_eq!(json["storeName"], "Test Store");
    }
}
