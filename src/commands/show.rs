//! `inventory show` command - list configurations and summaries

use anyhow::Result;
use std::path::PathBuf;

use katyusha_inventory::{BenchmarkConfiguration, Inventory};

use crate::settings::Settings;

pub async fn execute(
    settings: &Settings,
    db: Option<PathBuf>,
    id: Option<i64>,
    url: Option<String>,
    all: bool,
    full: bool,
) -> Result<()> {
    let inventory = Inventory::open(settings.db_path(db)?).await?;

    let configs: Vec<BenchmarkConfiguration> = if let Some(id) = id {
        inventory.find_by_id(id).await?.into_iter().collect()
    } else if let Some(url) = url {
        inventory.find_by_url(&url).await?
    } else if all {
        inventory.find_all().await?
    } else {
        Vec::new()
    };

    println!("Found {} benchmarks", configs.len());

    for (index, config) in configs.iter().enumerate() {
        println!("Benchmark [{}]", index + 1);
        println!("{config}");
        println!();

        if full {
            let summaries = inventory.find_summaries(config.id).await?;
            println!("Summaries:");
            for (index, summary) in summaries.iter().enumerate() {
                println!("[{}]", index + 1);
                println!("{summary}");
                println!();
            }
        }
    }

    Ok(())
}
