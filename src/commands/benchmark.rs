//! `benchmark` command - one-shot run from flags and files

use anyhow::Result;
use std::path::PathBuf;

use katyusha_core::Benchmark;
use katyusha_inventory::{Inventory, InventoryError};

use crate::cli::BenchmarkArgs;
use crate::settings::{BenchmarkFile, Settings};

pub async fn execute(settings: &Settings, db: Option<PathBuf>, args: BenchmarkArgs) -> Result<()> {
    let mut file = settings.benchmark_defaults();
    if let Some(path) = &args.benchmark_config {
        file = file.merged(BenchmarkFile::load(path)?);
    }

    let (params, description) = file.apply_flags(&args).into_parameters()?;

    let benchmark = Benchmark::new(params.clone())?;

    let inventory = if args.save {
        Some(Inventory::open(settings.db_path(db)?).await?)
    } else {
        None
    };

    let config_id = match &inventory {
        Some(inventory) => match inventory.insert_config(&params, &description).await {
            Ok(id) => Some(id),
            Err(InventoryError::Conflict { id }) => {
                tracing::warn!(id, "configuration already stored, reusing");
                Some(id)
            }
            Err(e) => return Err(e.into()),
        },
        None => None,
    };

    let summary = benchmark.run_with_signal_handling().await;
    println!("{summary}");

    if let (Some(inventory), Some(config_id)) = (&inventory, config_id) {
        inventory.insert_summary(&summary, config_id).await?;
        tracing::info!(config_id, "summary saved");
    }

    Ok(())
}
