//! Command dispatch

mod add;
mod benchmark;
mod delete;
mod run;
mod show;

use anyhow::Result;

use crate::cli::{Cli, Commands, InventoryCommand};
use crate::settings::Settings;

pub async fn dispatch(cli: Cli) -> Result<()> {
    let settings = Settings::load(cli.config)?;

    match cli.command {
        Commands::Benchmark(args) => benchmark::execute(&settings, cli.db, args).await,
        Commands::Inventory(inventory) => match inventory.command {
            InventoryCommand::Add { file } => add::execute(&settings, cli.db, &file).await,
            InventoryCommand::Show { id, url, all, full } => {
                show::execute(&settings, cli.db, id, url, all, full).await
            }
            InventoryCommand::Run { id, save } => run::execute(&settings, cli.db, id, save).await,
            InventoryCommand::Delete { id } => delete::execute(&settings, cli.db, id).await,
        },
    }
}
