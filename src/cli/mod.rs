//! CLI argument parsing

use clap::{ArgAction, Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

#[derive(Parser, Debug)]
#[command(name = "katyusha")]
#[command(author, version, about = "HTTP benchmarking tool with a persistent inventory")]
pub struct Cli {
    /// Config file
    #[arg(long, global = true, env = "KATYUSHA_CONFIG")]
    pub config: Option<PathBuf>,

    /// Inventory file location
    #[arg(long, global = true, env = "KATYUSHA_DB")]
    pub db: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run HTTP benchmark
    Benchmark(BenchmarkArgs),

    /// Manage stored benchmark configurations
    Inventory(InventoryArgs),
}

#[derive(Args, Debug, Default)]
pub struct BenchmarkArgs {
    /// Benchmark configuration file
    #[arg(short = 'b', long)]
    pub benchmark_config: Option<PathBuf>,

    /// Benchmark description used in the inventory
    #[arg(long, env = "KATYUSHA_DESCRIPTION")]
    pub description: Option<String>,

    /// Target host URL
    #[arg(long, env = "KATYUSHA_HOST")]
    pub host: Option<String>,

    /// HTTP method
    #[arg(short, long, env = "KATYUSHA_METHOD")]
    pub method: Option<String>,

    /// CA path
    #[arg(short = 'c', long, env = "KATYUSHA_CA")]
    pub ca: Option<String>,

    /// Cert path
    #[arg(short = 'F', long, env = "KATYUSHA_CERT")]
    pub cert: Option<String>,

    /// Key path
    #[arg(short = 'K', long, env = "KATYUSHA_KEY")]
    pub key: Option<String>,

    /// Version endpoint; the response is embedded in the summary
    #[arg(short = 'E', long, env = "KATYUSHA_VERSION_ENDPOINT")]
    pub version_endpoint: Option<String>,

    /// Save benchmark configuration and result
    #[arg(short = 's', long)]
    pub save: bool,

    /// TLS skip verify
    #[arg(short = 'i', long)]
    pub insecure: bool,

    /// Benchmark duration
    #[arg(short = 'd', long, env = "KATYUSHA_DURATION", value_parser = humantime::parse_duration)]
    pub duration: Option<Duration>,

    /// HTTP keep alive
    #[arg(short = 'k', long, env = "KATYUSHA_KEEP_ALIVE", value_parser = humantime::parse_duration)]
    pub keep_alive: Option<Duration>,

    /// Delay between requests of one connection
    #[arg(short = 'D', long, env = "KATYUSHA_REQUEST_DELAY", value_parser = humantime::parse_duration)]
    pub request_delay: Option<Duration>,

    /// Read timeout
    #[arg(short = 'R', long, env = "KATYUSHA_READ_TIMEOUT", value_parser = humantime::parse_duration)]
    pub read_timeout: Option<Duration>,

    /// Write timeout
    #[arg(short = 'W', long, env = "KATYUSHA_WRITE_TIMEOUT", value_parser = humantime::parse_duration)]
    pub write_timeout: Option<Duration>,

    /// Requests count
    #[arg(short = 'r', long, env = "KATYUSHA_REQUESTS")]
    pub requests: Option<u64>,

    /// Concurrent connections
    #[arg(short = 'C', long, env = "KATYUSHA_CONNECTIONS")]
    pub connections: Option<usize>,

    /// Failure count after which the benchmark is aborted
    #[arg(short = 'a', long, env = "KATYUSHA_ABORT")]
    pub abort: Option<u64>,

    /// Header, can be used multiple times ("Name: value")
    #[arg(short = 'H', long = "header")]
    pub headers: Vec<String>,

    /// HTTP parameter group, can be used multiple times ("k1=v1&k2=v2")
    #[arg(short = 'P', long = "parameter")]
    pub parameters: Vec<String>,
}

#[derive(Args, Debug)]
pub struct InventoryArgs {
    #[command(subcommand)]
    pub command: InventoryCommand,
}

#[derive(Subcommand, Debug)]
pub enum InventoryCommand {
    /// Add a benchmark configuration from a file
    Add {
        /// Benchmark file
        #[arg(short = 'f', long)]
        file: PathBuf,
    },

    /// Show benchmark configurations and their summaries
    Show {
        /// Benchmark configuration id
        #[arg(short = 'i', long)]
        id: Option<i64>,

        /// Benchmark URL
        #[arg(short = 'u', long)]
        url: Option<String>,

        /// Show all benchmarks
        #[arg(short = 'a', long, default_value_t = true, action = ArgAction::Set)]
        all: bool,

        /// Also show stored summaries
        #[arg(short = 'f', long)]
        full: bool,
    },

    /// Run a benchmark from the inventory
    Run {
        /// Benchmark configuration id
        #[arg(short = 'i', long)]
        id: i64,

        /// Save the result
        #[arg(short = 's', long)]
        save: bool,
    },

    /// Delete a benchmark configuration with all associated data
    Delete {
        /// Benchmark configuration id
        #[arg(short = 'i', long)]
        id: i64,
    },
}
