use ethers_core::types::{H160, H256, U256};

const WEI_PER_ETH: u64 = 1_000_000_000_000_000_000;

/// Convert a raw wei amount to ETH.
///
/// The division happens in integer space first so values far beyond the
/// float-safe range keep their magnitude; only the final narrowing to
/// `f64` loses precision (~15 significant digits, same as the upstream
/// explorer UI).
pub fn wei_to_eth(value: U256) -> f64 {
    let (whole, rem) = value.div_mod(U256::from(WEI_PER_ETH));
    u256_to_u128_lossy(whole) as f64 + rem.as_u128() as f64 / 1e18
}

/// Parse a wei amount from either a `0x`-prefixed hex string or a
/// decimal string. Returns `None` for anything malformed.
pub fn parse_wei(raw: &str) -> Option<U256> {
    let raw = raw.trim();
    if let Some(hex) = raw.strip_prefix("0x").or_else(|| raw.strip_prefix("0X")) {
        U256::from_str_radix(hex, 16).ok()
    } else {
        U256::from_dec_str(raw).ok()
    }
}

pub fn u256_to_u64_lossy(value: U256) -> u64 {
    u64::try_from(value).unwrap_or(u64::MAX)
}

pub fn u256_to_i64_lossy(value: U256) -> i64 {
    u64::try_from(value)
        .ok()
        .and_then(|v| i64::try_from(v).ok())
        .unwrap_or(i64::MAX)
}

fn u256_to_u128_lossy(value: U256) -> u128 {
    u128::try_from(value).unwrap_or(u128::MAX)
}

pub fn address_to_lower_hex(addr: H160) -> String {
    format!("0x{:x}", addr)
}

pub fn hash_to_lower_hex(hash: H256) -> String {
    format!("0x{:x}", hash)
}
