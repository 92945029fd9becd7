use anyhow::{bail, Context};
use till_db::Database;
use tracing::warn;

pub(super) async fn run(db: &Database) -> anyhow::Result<()> {
    if !db.health_check().await {
        bail!("database is not responding");
    }

    let (embedded, applied) = db
        .migration_status()
        .await
        .context("failed to read migration status")?;
    let products = db.products().count().await.context("failed to count products")?;
    let sales = db.sales().count().await.context("failed to count sales")?;

    println!("database      ok");
    println!("migrations    {applied}/{embedded} applied");
    println!("products      {products} active");
    println!("sales         {sales} recorded");

    if applied < embedded {
        warn!(applied, embedded, "Pending migrations");
    }
    Ok(())
}
