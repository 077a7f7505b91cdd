//! `inventory delete` command - remove a configuration and its data

use anyhow::Result;
use std::path::PathBuf;

use katyusha_inventory::Inventory;

use crate::settings::Settings;

pub async fn execute(settings: &Settings, db: Option<PathBuf>, id: i64) -> Result<()> {
    let inventory = Inventory::open(settings.db_path(db)?).await?;
    inventory.delete(id).await?;

    println!("Benchmark with all data removed");

    Ok(())
}
