use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use ethers_core::types::H256;

use whale_watch::analytics;
use whale_watch::api::{self, AppState};
use whale_watch::chat::ChatClient;
use whale_watch::cli::{Cli, Commands};
use whale_watch::config::Config;
use whale_watch::eth::{EthClient, HashResolution};
use whale_watch::search::{self, SearchKind};
use whale_watch::store::{FileStore, KvStore, SearchHistory, WhaleStore};
use whale_watch::units::wei_to_eth;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env().context("failed to load configuration")?;
    let client = EthClient::new(config.rpc_url_for(cli.network)?)?;

    match cli.command {
        Commands::Analyze { blocks } => {
            let batch = client.fetch_recent_blocks(blocks).await?;
            let summary = analytics::aggregate(&batch);
            println!("{}", serde_json::to_string_pretty(&summary)?);
        }
        Commands::Whales { blocks, min_value } => {
            let batch = client.fetch_recent_blocks(blocks).await?;
            let whales = analytics::collect_whales(&batch, min_value);
            tracing::info!(
                "{} whale transactions >= {} ETH in the last {} blocks",
                whales.len(),
                min_value,
                batch.len()
            );
            println!("{}", serde_json::to_string_pretty(&whales)?);
        }
        Commands::TopAddresses { blocks, limit } => {
            let batch = client.fetch_recent_blocks(blocks).await?;
            let top = analytics::top_addresses(&batch, limit);
            println!("{}", serde_json::to_string_pretty(&top)?);
        }
        Commands::Search { query } => {
            let result = run_search(&client, &query).await?;
            println!("{}", serde_json::to_string_pretty(&result)?);
        }
        Commands::Serve { addr } => {
            let bind = addr.unwrap_or_else(|| config.http_bind_addr.clone());
            let kv: Arc<dyn KvStore> = Arc::new(FileStore::new(&config.store_path));
            let chat = config
                .chat_api_key
                .clone()
                .map(|key| ChatClient::new(config.chat_api_url.clone(), key, config.chat_model.clone()));
            let state = AppState {
                client,
                whales: WhaleStore::new(kv.clone()),
                searches: SearchHistory::new(kv),
                chat,
            };
            api::run_http_server(&bind, state).await?;
        }
    }

    Ok(())
}

async fn run_search(client: &EthClient, query: &str) -> anyhow::Result<serde_json::Value> {
    match search::detect(query) {
        SearchKind::BlockNumber(number) => match client.block_by_number(number, false).await? {
            Some(block) => Ok(serde_json::json!({ "type": "block", "block": block })),
            None => anyhow::bail!("block {} not found", number),
        },
        SearchKind::Address(address) => {
            let balance = client.balance(&address).await?;
            let tx_count = client.transaction_count(&address).await?;
            Ok(serde_json::json!({
                "type": "address",
                "address": address,
                "balance_wei": balance.to_string(),
                "balance_eth": wei_to_eth(balance),
                "tx_count": tx_count,
            }))
        }
        SearchKind::Hash(hash) => {
            let hash: H256 = hash.parse().context("malformed hash")?;
            match client.resolve_hash(hash).await? {
                HashResolution::Transaction(tx) => {
                    Ok(serde_json::json!({ "type": "transaction", "transaction": tx }))
                }
                HashResolution::Block(block) => {
                    Ok(serde_json::json!({ "type": "block", "block": block }))
                }
                HashResolution::NotFound => anyhow::bail!("{} matches no transaction or block", hash),
            }
        }
        SearchKind::Unknown => anyhow::bail!("unrecognized query: {}", query),
    }
}

fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();
}
