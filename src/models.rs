use ethers_core::types::{H160, H256, U256, U64};
use serde::{Deserialize, Deserializer, Serialize};

/// A block as returned by `eth_getBlockByNumber` / `eth_getBlockByHash`.
///
/// Quantities stay in their wire-native fixed-width types so wei values
/// never round-trip through floats.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlockRecord {
    pub number: U64,
    pub hash: H256,
    pub parent_hash: H256,
    pub miner: H160,
    pub gas_used: U256,
    pub gas_limit: U256,
    #[serde(default)]
    pub size: Option<U256>,
    pub timestamp: U256,
    #[serde(default, deserialize_with = "lenient_transactions")]
    pub transactions: Option<BlockTransactions>,
}

/// Transaction list of a block: full objects, or bare hashes when the
/// block was fetched without `fullTransactions`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum BlockTransactions {
    Full(Vec<TxRecord>),
    Hashes(Vec<H256>),
}

impl BlockTransactions {
    pub fn len(&self) -> usize {
        match self {
            BlockTransactions::Full(txs) => txs.len(),
            BlockTransactions::Hashes(hashes) => hashes.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A malformed or missing transaction list must not sink the whole block;
/// it degrades to `None` and the block contributes zero to tx accounting.
fn lenient_transactions<'de, D>(deserializer: D) -> Result<Option<BlockTransactions>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = serde_json::Value::deserialize(deserializer)?;
    Ok(serde_json::from_value(raw).ok())
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TxRecord {
    pub hash: H256,
    pub from: H160,
    #[serde(default)]
    pub to: Option<H160>,
    pub value: U256,
    pub gas: U256,
    #[serde(default)]
    pub gas_price: Option<U256>,
    #[serde(default)]
    pub max_fee_per_gas: Option<U256>,
    #[serde(default)]
    pub nonce: Option<U256>,
    #[serde(default)]
    pub block_number: Option<U64>,
    #[serde(default)]
    pub input: Option<String>,
}

/// Whale size tier. Thresholds live in [`crate::analytics`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WhaleSize {
    Large,
    Huge,
    Mega,
}

impl std::fmt::Display for WhaleSize {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WhaleSize::Large => write!(f, "large"),
            WhaleSize::Huge => write!(f, "huge"),
            WhaleSize::Mega => write!(f, "mega"),
        }
    }
}

/// A classified whale transaction, detached from its block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WhaleTransaction {
    pub hash: String,
    pub from: String,
    pub to: Option<String>,
    pub value_wei: String,
    pub value_eth: f64,
    pub timestamp: i64,
    pub block_number: u64,
    pub size: WhaleSize,
    /// Set when the user pins the whale to the local store; live
    /// discoveries carry `None`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressActivity {
    pub address: String,
    pub count: u64,
    pub volume_eth: f64,
}

/// One row per aggregated block, in chronological-ascending order when
/// the input batch was newest-first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BlockRow {
    pub number: u64,
    pub tx_count: u64,
    pub volume_eth: f64,
    pub gas_used: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalyticsSummary {
    pub total_volume_eth: f64,
    pub total_tx_count: u64,
    pub total_gas_used: u64,
    pub avg_block_time_secs: f64,
    pub avg_tx_per_block: f64,
    pub unique_addresses: u64,
    pub top_addresses: Vec<AddressActivity>,
    pub block_rows: Vec<BlockRow>,
}

/// A recorded search, kept newest-first in the local store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchEntry {
    pub query: String,
    pub kind: String,
    pub searched_at: i64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block_json(transactions: serde_json::Value) -> serde_json::Value {
        json!({
            "number": "0x10",
            "hash": "0x00000000000000000000000000000000000000000000000000000000000000aa",
            "parentHash": "0x00000000000000000000000000000000000000000000000000000000000000ab",
            "miner": "0x0000000000000000000000000000000000000001",
            "gasUsed": "0x5208",
            "gasLimit": "0x1c9c380",
            "size": "0x220",
            "timestamp": "0x64",
            "transactions": transactions,
        })
    }

    #[test]
    fn block_with_full_transactions_deserializes() {
        let raw = block_json(json!([{
            "hash": "0x00000000000000000000000000000000000000000000000000000000000000cc",
            "from": "0x0000000000000000000000000000000000000002",
            "to": "0x0000000000000000000000000000000000000003",
            "value": "0xde0b6b3a7640000",
            "gas": "0x5208",
            "gasPrice": "0x3e8",
            "nonce": "0x1",
            "input": "0x"
        }]));

        let block: BlockRecord = serde_json::from_value(raw).unwrap();
        assert_eq!(block.number.as_u64(), 16);
        match block.transactions {
            Some(BlockTransactions::Full(ref txs)) => assert_eq!(txs.len(), 1),
            other => panic!("expected full transactions, got {:?}", other),
        }
    }

    #[test]
    fn block_with_hash_only_transactions_deserializes() {
        let raw = block_json(json!([
            "0x00000000000000000000000000000000000000000000000000000000000000cc",
            "0x00000000000000000000000000000000000000000000000000000000000000cd",
        ]));

        let block: BlockRecord = serde_json::from_value(raw).unwrap();
        match block.transactions {
            Some(BlockTransactions::Hashes(ref hashes)) => assert_eq!(hashes.len(), 2),
            other => panic!("expected hash-only transactions, got {:?}", other),
        }
    }

    #[test]
    fn malformed_transaction_list_degrades_to_none() {
        let block: BlockRecord = serde_json::from_value(block_json(json!(42))).unwrap();
        assert!(block.transactions.is_none());

        let mut raw = block_json(json!([]));
        raw.as_object_mut().unwrap().remove("transactions");
        let block: BlockRecord = serde_json::from_value(raw).unwrap();
        assert!(block.transactions.is_none());
    }
}
