use clap::{Parser, Subcommand};

use crate::config::Network;

#[derive(Parser, Debug)]
#[command(
    name = "whale-watch",
    version,
    about = "Ethereum whale tracker and block analytics"
)]
pub struct Cli {
    /// Chain endpoint to target
    #[arg(long, value_enum, global = true, default_value_t = Network::Mainnet)]
    pub network: Network,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Aggregate analytics over the last N blocks
    Analyze {
        #[arg(long, default_value_t = 50)]
        blocks: u64,
    },
    /// List live whale transactions found in the last N blocks
    Whales {
        #[arg(long, default_value_t = 30)]
        blocks: u64,
        /// Minimum value in ETH (presets: 1000, 10000, 50000, 100000)
        #[arg(long, default_value_t = 10_000.0)]
        min_value: f64,
    },
    /// Print the most active addresses in the last N blocks
    TopAddresses {
        #[arg(long, default_value_t = 50)]
        blocks: u64,
        #[arg(long, default_value_t = 10)]
        limit: usize,
    },
    /// Resolve a block number, address, or tx/block hash
    Search {
        query: String,
    },
    /// Run the HTTP API server
    Serve {
        /// Override bind address, e.g. 0.0.0.0:8080
        #[arg(long)]
        addr: Option<String>,
    },
}
