use anyhow::Context;
use till_core::NewProduct;
use till_db::{Database, DbResult};
use tracing::info;

use super::operator;

/// `(name, category, price_cents, stock, barcode, min_stock)`
const DEMO_CATALOG: [(&str, &str, i64, i64, &str, i64); 5] = [
    ("Rice 25kg", "Groceries", 125000, 50, "8901234567890", 10),
    ("Cooking Oil 1L", "Groceries", 18000, 30, "8901234567891", 5),
    ("Sugar 1kg", "Groceries", 6500, 45, "8901234567892", 10),
    ("Coffee 3-in-1 Pack", "Beverages", 12000, 60, "8901234567893", 15),
    ("Instant Noodles Pack", "Food", 8500, 100, "8901234567894", 20),
];

pub(super) async fn run(db: &Database) -> anyhow::Result<()> {
    let inserted = seed_demo_catalog(db)
        .await
        .context("failed to seed demo catalog")?;

    if inserted == 0 {
        println!("catalog already has products, nothing seeded");
    } else {
        println!("seeded {inserted} demo products");
    }
    Ok(())
}

/// Inserts the demo catalog if the catalog is empty. Returns rows inserted.
async fn seed_demo_catalog(db: &Database) -> DbResult<usize> {
    let products = db.products();

    let existing = products.count().await?;
    if existing > 0 {
        info!(existing, "Catalog not empty, skipping seed");
        return Ok(0);
    }

    let operator = operator();
    for (name, category, price_cents, stock, barcode, min_stock) in DEMO_CATALOG {
        products
            .create(
                &operator,
                NewProduct {
                    name: name.to_string(),
                    category: category.to_string(),
                    price_cents,
                    stock,
                    barcode: barcode.to_string(),
                    min_stock,
                },
            )
            .await?;
    }

    info!(count = DEMO_CATALOG.len(), "Demo catalog seeded");
    Ok(DEMO_CATALOG.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use till_db::DbConfig;

    #[tokio::test]
    async fn test_seed_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();

        assert_eq!(seed_demo_catalog(&db).await.unwrap(), 5);
        assert_eq!(seed_demo_catalog(&db).await.unwrap(), 0);

        let rice = db
            .products()
            .get_by_barcode("8901234567890")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(rice.name, "Rice 25kg");
        assert_eq!(rice.price().to_string(), "1250.00");
        assert_eq!(db.products().count().await.unwrap(), 5);
    }
}
