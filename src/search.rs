/// What a free-form search query most likely refers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SearchKind {
    /// A decimal block number.
    BlockNumber(u64),
    /// A 20-byte hex address.
    Address(String),
    /// A 32-byte hex digest; could be a transaction or a block hash, the
    /// RPC has to disambiguate.
    Hash(String),
    Unknown,
}

impl SearchKind {
    pub fn label(&self) -> &'static str {
        match self {
            SearchKind::BlockNumber(_) => "block",
            SearchKind::Address(_) => "address",
            SearchKind::Hash(_) => "hash",
            SearchKind::Unknown => "unknown",
        }
    }
}

/// Classify a raw query. Input is trimmed and lowercased; hex strings are
/// told apart by length alone (a tx hash and a block hash are
/// indistinguishable without asking the node).
pub fn detect(query: &str) -> SearchKind {
    let query = query.trim().to_lowercase();
    if query.is_empty() {
        return SearchKind::Unknown;
    }

    if query.chars().all(|c| c.is_ascii_digit()) {
        return match query.parse::<u64>() {
            Ok(number) => SearchKind::BlockNumber(number),
            Err(_) => SearchKind::Unknown,
        };
    }

    if let Some(hex) = query.strip_prefix("0x") {
        if !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return SearchKind::Unknown;
        }
        // 0x + 64 hex chars: tx or block hash. 0x + 40: address.
        return match query.len() {
            66 => SearchKind::Hash(query),
            42 => SearchKind::Address(query),
            _ => SearchKind::Unknown,
        };
    }

    SearchKind::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn digits_are_a_block_number() {
        assert_eq!(detect("12345"), SearchKind::BlockNumber(12345));
        assert_eq!(detect(" 7 "), SearchKind::BlockNumber(7));
    }

    #[test]
    fn forty_hex_chars_are_an_address() {
        let addr = format!("0x{}", "ab".repeat(20));
        assert_eq!(detect(&addr), SearchKind::Address(addr.clone()));
        // Uppercase input normalizes.
        assert_eq!(detect(&addr.to_uppercase()), SearchKind::Address(addr));
    }

    #[test]
    fn sixty_four_hex_chars_are_a_hash() {
        let hash = format!("0x{}", "cd".repeat(32));
        assert_eq!(detect(&hash), SearchKind::Hash(hash.clone()));
    }

    #[test]
    fn everything_else_is_unknown() {
        assert_eq!(detect(""), SearchKind::Unknown);
        assert_eq!(detect("hello"), SearchKind::Unknown);
        assert_eq!(detect("0xzz"), SearchKind::Unknown);
        // Hex of an in-between length.
        assert_eq!(detect("0xabcdef"), SearchKind::Unknown);
        // Too many digits for a block number.
        assert_eq!(detect("99999999999999999999999999"), SearchKind::Unknown);
    }
}
