use anyhow::{Context, Result};
use ethers_core::types::{H256, U256, U64};
use ethers_providers::{Http, Middleware, Provider};
use futures_util::{stream, StreamExt, TryStreamExt};
use url::Url;

use crate::models::{BlockRecord, BlockTransactions, TxRecord};
use crate::units::u256_to_u64_lossy;

/// How many blocks are fetched in flight at once when taking a snapshot.
const FETCH_CONCURRENCY: usize = 8;

/// How many of the newest blocks feed the recent-transactions view.
const RECENT_TX_BLOCK_WINDOW: u64 = 5;

#[derive(Clone)]
pub struct EthClient {
    provider: Provider<Http>,
}

/// Outcome of looking up a 32-byte hash that could name either a
/// transaction or a block.
#[derive(Debug)]
pub enum HashResolution {
    Transaction(TxRecord),
    Block(BlockRecord),
    NotFound,
}

impl EthClient {
    pub fn new(rpc_url: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .no_proxy()
            .build()
            .context("failed to build reqwest client")?;
        let url = Url::parse(rpc_url).context("invalid RPC url")?;
        let transport = Http::new_with_client(url, client);
        let provider = Provider::new(transport);
        Ok(Self { provider })
    }

    pub async fn latest_block_number(&self) -> Result<u64> {
        let number = self
            .provider
            .get_block_number()
            .await
            .context("failed to fetch latest block number")?;
        Ok(number.as_u64())
    }

    pub async fn block_by_number(
        &self,
        number: u64,
        full_txs: bool,
    ) -> Result<Option<BlockRecord>> {
        let tag = format!("0x{:x}", number);
        self.provider
            .request("eth_getBlockByNumber", (tag, full_txs))
            .await
            .with_context(|| format!("failed to fetch block {}", number))
    }

    pub async fn block_by_hash(&self, hash: H256, full_txs: bool) -> Result<Option<BlockRecord>> {
        self.provider
            .request("eth_getBlockByHash", (hash, full_txs))
            .await
            .with_context(|| format!("failed to fetch block {:#x}", hash))
    }

    pub async fn transaction_by_hash(&self, hash: H256) -> Result<Option<TxRecord>> {
        self.provider
            .request("eth_getTransactionByHash", (hash,))
            .await
            .with_context(|| format!("failed to fetch transaction {:#x}", hash))
    }

    pub async fn balance(&self, address: &str) -> Result<U256> {
        self.provider
            .request("eth_getBalance", (address, "latest"))
            .await
            .with_context(|| format!("failed to fetch balance of {}", address))
    }

    pub async fn transaction_count(&self, address: &str) -> Result<u64> {
        let count: U256 = self
            .provider
            .request("eth_getTransactionCount", (address, "latest"))
            .await
            .with_context(|| format!("failed to fetch nonce of {}", address))?;
        Ok(u256_to_u64_lossy(count))
    }

    pub async fn gas_price(&self) -> Result<U256> {
        self.provider
            .request("eth_gasPrice", ())
            .await
            .context("failed to fetch gas price")
    }

    pub async fn chain_id(&self) -> Result<u64> {
        let id: U64 = self
            .provider
            .request("eth_chainId", ())
            .await
            .context("failed to fetch chain id")?;
        Ok(id.as_u64())
    }

    /// Fetch the newest `count` blocks with full transactions, newest
    /// first, as one immutable snapshot.
    ///
    /// Fetches run concurrently but order-preserving; aggregation only
    /// ever sees the complete batch. Blocks the node reports as missing
    /// are dropped from the snapshot rather than failing it.
    pub async fn fetch_recent_blocks(&self, count: u64) -> Result<Vec<BlockRecord>> {
        if count == 0 {
            return Ok(Vec::new());
        }

        let latest = self.latest_block_number().await?;
        let fetched: Vec<Option<BlockRecord>> = stream::iter(block_window(latest, count))
            .map(|number| self.block_by_number(number, true))
            .buffered(FETCH_CONCURRENCY)
            .try_collect()
            .await?;

        Ok(fetched.into_iter().flatten().collect())
    }

    /// Flatten transactions out of the newest blocks until `limit` is
    /// reached.
    pub async fn recent_transactions(&self, limit: usize) -> Result<Vec<TxRecord>> {
        let blocks = self.fetch_recent_blocks(RECENT_TX_BLOCK_WINDOW).await?;
        let mut txs = Vec::new();
        for block in blocks {
            if let Some(BlockTransactions::Full(block_txs)) = block.transactions {
                txs.extend(block_txs);
                if txs.len() >= limit {
                    break;
                }
            }
        }
        txs.truncate(limit);
        Ok(txs)
    }

    /// Try a 32-byte hash as a transaction first, then as a block hash.
    /// Lookup failures on either leg degrade to "not found"; the caller
    /// only cares what the hash resolves to, not why a leg failed.
    pub async fn resolve_hash(&self, hash: H256) -> Result<HashResolution> {
        match self.transaction_by_hash(hash).await {
            Ok(Some(tx)) => return Ok(HashResolution::Transaction(tx)),
            Ok(None) => {}
            Err(err) => tracing::debug!("hash {:#x} did not resolve as a transaction: {}", hash, err),
        }

        match self.block_by_hash(hash, false).await {
            Ok(Some(block)) => Ok(HashResolution::Block(block)),
            Ok(None) => Ok(HashResolution::NotFound),
            Err(err) => {
                tracing::debug!("hash {:#x} did not resolve as a block: {}", hash, err);
                Ok(HashResolution::NotFound)
            }
        }
    }
}

/// The block numbers of a `count`-sized window ending at `latest`,
/// newest first, clipped at genesis.
fn block_window(latest: u64, count: u64) -> Vec<u64> {
    (0..count).filter_map(|i| latest.checked_sub(i)).collect()
}
