use anyhow::Context;
use clap::Args;
use till_core::report::{low_stock, stock_level, StockLevel};
use till_core::Product;
use till_db::Database;

use crate::config::TillConfig;

#[derive(Debug, Args)]
pub(crate) struct ProductsArgs {
    /// Case-insensitive match on name, category or barcode
    #[arg(long)]
    search: Option<String>,

    /// Maximum rows to print
    #[arg(long, default_value_t = 50)]
    limit: u32,
}

pub(super) async fn run(args: ProductsArgs, db: &Database, config: &TillConfig) -> anyhow::Result<()> {
    let products = match args.search.as_deref() {
        Some(term) => db
            .products()
            .search(term, args.limit)
            .await
            .with_context(|| format!("failed to search products for '{term}'"))?,
        None => {
            let mut all = db.products().list().await.context("failed to list products")?;
            all.truncate(args.limit as usize);
            all
        }
    };

    if products.is_empty() {
        println!("no products found");
        return Ok(());
    }

    for product in &products {
        println!("{}", product_row(product, &config.currency_symbol));
    }
    Ok(())
}

pub(super) async fn run_low_stock(db: &Database, config: &TillConfig) -> anyhow::Result<()> {
    let products = db.products().list().await.context("failed to list products")?;
    let low = low_stock(&products);

    if low.is_empty() {
        println!("no products at or below their low-stock threshold");
        return Ok(());
    }

    for product in &low {
        println!("{}", product_row(product, &config.currency_symbol));
    }
    Ok(())
}

fn product_row(product: &Product, currency_symbol: &str) -> String {
    let level = match stock_level(product) {
        StockLevel::Low => "LOW",
        StockLevel::Normal => "ok",
        StockLevel::High => "high",
    };

    format!(
        "{:<24} {:<12} {:>12} stock {:>4} (min {:>3}, {:<4}) {}",
        product.name,
        product.category,
        product.price().format_with(currency_symbol),
        product.stock,
        product.min_stock,
        level,
        product.barcode
    )
}
