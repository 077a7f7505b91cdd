//! `inventory run` command - re-run a stored configuration

use anyhow::{bail, Result};
use std::path::PathBuf;

use katyusha_core::Benchmark;
use katyusha_inventory::Inventory;

use crate::settings::Settings;

pub async fn execute(settings: &Settings, db: Option<PathBuf>, id: i64, save: bool) -> Result<()> {
    let inventory = Inventory::open(settings.db_path(db)?).await?;

    let Some(config) = inventory.find_by_id(id).await? else {
        bail!("benchmark {id} does not exist");
    };

    let benchmark = Benchmark::new(config.params.clone())?;
    let summary = benchmark.run_with_signal_handling().await;

    println!("{summary}");

    if save {
        inventory.insert_summary(&summary, config.id).await?;
        tracing::info!(config_id = config.id, "summary saved");
    }

    Ok(())
}
