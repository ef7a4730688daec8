//! `supportdesk seed` — Load the demo reference data.

use std::path::Path;

use supportdesk_store::fixtures::seed_demo;

pub async fn run(config_path: Option<&Path>) -> Result<(), Box<dyn std::error::Error>> {
    let config = super::load_config(config_path)?;
    let store = super::open_store(&config).await?;

    let report = seed_demo(&store).await?;

    println!("🌱 Seeded {}", config.database.url);
    println!("   Orders:   {}", report.orders);
    println!("   Products: {}", report.products);
    println!("   Policies: {}", report.policies);

    store.close().await;
    Ok(())
}
