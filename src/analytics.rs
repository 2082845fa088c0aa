//! Whale classification and rolling analytics over a batch of recent
//! blocks.
//!
//! Both passes are pure and synchronous: they take an immutable snapshot
//! of blocks (as fetched by [`crate::eth::EthClient`]) and recompute
//! everything from scratch. Malformed blocks are contained, never
//! propagated, so a partially-degraded batch still produces a summary.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::models::{
    AddressActivity, AnalyticsSummary, BlockRecord, BlockRow, BlockTransactions, WhaleSize,
    WhaleTransaction,
};
use crate::units::{
    address_to_lower_hex, hash_to_lower_hex, u256_to_i64_lossy, u256_to_u64_lossy, wei_to_eth,
};

/// Tier cutoffs in ETH. Monotonic and mutually exclusive.
pub const LARGE_THRESHOLD_ETH: f64 = 10_000.0;
pub const HUGE_THRESHOLD_ETH: f64 = 50_000.0;
pub const MEGA_THRESHOLD_ETH: f64 = 100_000.0;

/// Preset minimum-value cutoffs offered by the filter UI and CLI.
pub const MIN_VALUE_PRESETS: [f64; 4] = [1_000.0, 10_000.0, 50_000.0, 100_000.0];

/// How many addresses the activity ranking surfaces.
pub const TOP_ADDRESS_LIMIT: usize = 10;

/// Tier a transaction by its ETH value.
///
/// Values below the large cutoff have no tier and are never surfaced,
/// regardless of how low the user sets the minimum-value filter.
pub fn classify(value_eth: f64) -> Option<WhaleSize> {
    if value_eth >= MEGA_THRESHOLD_ETH {
        Some(WhaleSize::Mega)
    } else if value_eth >= HUGE_THRESHOLD_ETH {
        Some(WhaleSize::Huge)
    } else if value_eth >= LARGE_THRESHOLD_ETH {
        Some(WhaleSize::Large)
    } else {
        None
    }
}

/// Scan a batch of blocks for whale transactions at or above
/// `min_value_eth`, largest first.
///
/// Only blocks carrying full transaction objects participate; hash-only
/// and malformed lists have no values to classify.
pub fn collect_whales(blocks: &[BlockRecord], min_value_eth: f64) -> Vec<WhaleTransaction> {
    let mut whales = Vec::new();

    for block in blocks {
        let Some(BlockTransactions::Full(txs)) = &block.transactions else {
            continue;
        };
        let timestamp = u256_to_i64_lossy(block.timestamp);

        for tx in txs {
            let value_eth = wei_to_eth(tx.value);
            if value_eth < min_value_eth {
                continue;
            }
            let Some(size) = classify(value_eth) else {
                continue;
            };
            whales.push(WhaleTransaction {
                hash: hash_to_lower_hex(tx.hash),
                from: address_to_lower_hex(tx.from),
                to: tx.to.map(address_to_lower_hex),
                value_wei: tx.value.to_string(),
                value_eth,
                timestamp,
                block_number: block.number.as_u64(),
                size,
                saved_at: None,
            });
        }
    }

    whales.sort_by(|a, b| {
        b.value_eth
            .partial_cmp(&a.value_eth)
            .unwrap_or(Ordering::Equal)
    });
    whales
}

#[derive(Debug, Default)]
struct Activity {
    first_seen: usize,
    count: u64,
    volume_eth: f64,
}

/// Aggregate a batch of blocks into one [`AnalyticsSummary`].
///
/// The batch is conventionally newest-first; block rows come back in the
/// reverse of the input order. An empty batch yields an all-zero summary
/// (callers distinguish "no data yet" with an `Option` around the whole
/// summary, not via zeros).
pub fn aggregate(blocks: &[BlockRecord]) -> AnalyticsSummary {
    let mut total_volume_eth = 0.0f64;
    let mut total_tx_count = 0u64;
    let mut total_gas_used = 0u64;
    let mut activity: HashMap<String, Activity> = HashMap::new();
    let mut block_rows = Vec::with_capacity(blocks.len());

    for block in blocks {
        // An absent or malformed transaction list zeroes the whole block
        // out of tx accounting without failing the batch.
        let Some(transactions) = &block.transactions else {
            continue;
        };

        let tx_count = transactions.len() as u64;
        let gas_used = u256_to_u64_lossy(block.gas_used);
        total_tx_count += tx_count;
        total_gas_used = total_gas_used.saturating_add(gas_used);

        let mut block_volume = 0.0f64;

        if let BlockTransactions::Full(txs) = transactions {
            for tx in txs {
                let value_eth = wei_to_eth(tx.value);
                total_volume_eth += value_eth;
                block_volume += value_eth;

                track(&mut activity, address_to_lower_hex(tx.from), value_eth);
                if let Some(to) = tx.to {
                    track(&mut activity, address_to_lower_hex(to), value_eth);
                }
            }
        }

        block_rows.push(BlockRow {
            number: block.number.as_u64(),
            tx_count,
            volume_eth: round2(block_volume),
            gas_used,
        });
    }

    let unique_addresses = activity.len() as u64;
    let top_addresses = rank_addresses(activity, TOP_ADDRESS_LIMIT);

    let avg_block_time_secs = average_block_time(blocks);
    let avg_tx_per_block = if blocks.is_empty() {
        0.0
    } else {
        total_tx_count as f64 / blocks.len() as f64
    };

    block_rows.reverse();

    AnalyticsSummary {
        total_volume_eth,
        total_tx_count,
        total_gas_used,
        avg_block_time_secs,
        avg_tx_per_block,
        unique_addresses,
        top_addresses,
        block_rows,
    }
}

fn track(activity: &mut HashMap<String, Activity>, address: String, value_eth: f64) {
    let next_index = activity.len();
    let entry = activity.entry(address).or_insert_with(|| Activity {
        first_seen: next_index,
        ..Activity::default()
    });
    entry.count += 1;
    entry.volume_eth += value_eth;
}

/// Activity ranking alone, for callers that don't need a full summary.
pub fn top_addresses(blocks: &[BlockRecord], limit: usize) -> Vec<AddressActivity> {
    let mut activity: HashMap<String, Activity> = HashMap::new();
    for block in blocks {
        let Some(BlockTransactions::Full(txs)) = &block.transactions else {
            continue;
        };
        for tx in txs {
            let value_eth = wei_to_eth(tx.value);
            track(&mut activity, address_to_lower_hex(tx.from), value_eth);
            if let Some(to) = tx.to {
                track(&mut activity, address_to_lower_hex(to), value_eth);
            }
        }
    }
    rank_addresses(activity, limit)
}

/// Rank by transaction count descending; ties go to the address seen
/// first in the batch.
fn rank_addresses(activity: HashMap<String, Activity>, limit: usize) -> Vec<AddressActivity> {
    let mut ranked: Vec<(String, Activity)> = activity.into_iter().collect();
    ranked.sort_by(|a, b| {
        b.1.count
            .cmp(&a.1.count)
            .then(a.1.first_seen.cmp(&b.1.first_seen))
    });
    ranked.truncate(limit);
    ranked
        .into_iter()
        .map(|(address, act)| AddressActivity {
            address,
            count: act.count,
            volume_eth: act.volume_eth,
        })
        .collect()
}

/// Mean absolute gap between adjacent timestamps in the supplied order;
/// zero with fewer than two blocks. Blocks skipped for tx accounting
/// still carry a timestamp and participate here.
fn average_block_time(blocks: &[BlockRecord]) -> f64 {
    if blocks.len() < 2 {
        return 0.0;
    }
    let total: i64 = blocks
        .windows(2)
        .map(|pair| {
            (u256_to_i64_lossy(pair[0].timestamp) - u256_to_i64_lossy(pair[1].timestamp)).abs()
        })
        .sum();
    total as f64 / (blocks.len() - 1) as f64
}

fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}
