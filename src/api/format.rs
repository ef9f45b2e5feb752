//! Display formatting for ledger values in log output.

use chrono::{DateTime, Utc};

/// Render a unix timestamp as a UTC date-time string. Out-of-range values
/// fall back to the raw number.
pub fn format_timestamp(timestamp: i64) -> String {
    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| timestamp.to_string())
}

/// Shorten a 64-char hash to its first and last five characters.
pub fn short_hash(hash: &str) -> String {
    if hash.is_empty() || hash == "0" {
        return "<empty>".to_string();
    }
    if hash.len() <= 10 {
        return hash.to_string();
    }
    format!("{}...{}", &hash[..5], &hash[hash.len() - 5..])
}

/// Render an amount with thousands separators.
pub fn format_amount(amount: u64) -> String {
    let digits = amount.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
