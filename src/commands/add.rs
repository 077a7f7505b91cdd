//! `inventory add` command - store a configuration from a file

use anyhow::Result;
use std::path::{Path, PathBuf};

use katyusha_inventory::Inventory;

use crate::settings::{BenchmarkFile, Settings};

pub async fn execute(settings: &Settings, db: Option<PathBuf>, file: &Path) -> Result<()> {
    let (params, description) = settings
        .benchmark_defaults()
        .merged(BenchmarkFile::load(file)?)
        .into_parameters()?;

    let inventory = Inventory::open(settings.db_path(db)?).await?;
    let id = inventory.insert_config(&params, &description).await?;

    println!("Testcase added successfully with id: {id}");

    Ok(())
}
