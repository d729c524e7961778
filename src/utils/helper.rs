/// Display width for transaction ids
pub const TXID_DISPLAY_LEN: usize = 25;

/// Format an amount with two decimals.
///
/// Rounds the exact binary value to the nearest two-decimal string, so
/// `1.005` (really 1.00499999...) formats as `"1.00"`.
pub fn format_amount(amount: f64) -> String {
    format!("{:.2}", amount)
}

/// Numeric value of [`format_amount`], for fields kept as numbers
pub fn round_amount(amount: f64) -> f64 {
    format_amount(amount).parse().unwrap_or(amount)
}

/// Keep at most `max_chars` characters of `s`
pub fn truncate_display(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((cut, _)) => s[..cut].to_string(),
        None => s.to_string(),
    }
}
