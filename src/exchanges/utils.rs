//! Common utilities for exchange implementations.

/// Converts "LTC/USD" to "LTC:USD", the notation CEX.io uses in ticker payloads.
pub fn pair_to_symbol(pair: &str) -> String {
    pair.replace('/', ":")
}

/// Splits "LTC/USD" into ("LTC", "USD"). Returns None unless both sides are non-empty.
pub fn split_pair(pair: &str) -> Option<(&str, &str)> {
    let (base, quote) = pair.split_once('/')?;
    if base.is_empty() || quote.is_empty() || quote.contains('/') {
        return None;
    }
    Some((base, quote))
}
