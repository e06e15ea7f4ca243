/// Monetary units of the ledger
///
/// Every amount is an unsigned count of base units. Decimal coin strings
/// are only accepted at the CLI boundary and are converted exactly, without
/// passing through floating point.
///
/// ## Monetary Units
/// - **Unit**: the smallest indivisible amount
/// - **Coin**: 100,000,000 units
/// - **Block Reward**: 50 coins by default
/// - **Default Fee**: 0.0001 coins
///
use crate::error::{LedgerError, Result};

/// Number of base units in one coin
pub const UNITS_PER_COIN: u64 = 100_000_000;

/// Decimal places of a coin amount
pub const COIN_DECIMALS: usize = 8;

/// Default coinbase reward (50 coins)
pub const DEFAULT_BLOCK_REWARD: u64 = 50 * UNITS_PER_COIN;

/// Default transaction fee (0.0001 coins)
pub const DEFAULT_TRANSACTION_FEE: u64 = 10_000;

/// Parses a decimal coin string such as `"1.5"` or `"0.00000001"` into base
/// units. At most eight fractional digits are accepted.
///
/// # Examples
/// ```
/// use utxo_chain::core::monetary::parse_amount;
/// assert_eq!(parse_amount("1").unwrap(), 100_000_000);
/// assert_eq!(parse_amount("0.5").unwrap(), 50_000_000);
/// ```
pub fn parse_amount(input: &str) -> Result<u64> {
    let trimmed = input.trim();
    let invalid = || LedgerError::Parse(format!("Invalid coin amount {input:?}"));

    let (whole, fraction) = match trimmed.split_once('.') {
        Some((whole, fraction)) => (whole, fraction),
        None => (trimmed, ""),
    };
    if whole.is_empty() && fraction.is_empty() {
        return Err(invalid());
    }
    if !whole.chars().all(|c| c.is_ascii_digit()) || !fraction.chars().all(|c| c.is_ascii_digit())
    {
        return Err(invalid());
    }
    if fraction.len() > COIN_DECIMALS {
        return Err(LedgerError::Parse(format!(
            "Coin amount {input:?} has more than {COIN_DECIMALS} decimal places"
        )));
    }

    let whole_units = if whole.is_empty() {
        0
    } else {
        whole.parse::<u64>().map_err(|_| invalid())?
    };
    let fraction_units = if fraction.is_empty() {
        0
    } else {
        let padded = format!("{fraction:0<width$}", width = COIN_DECIMALS);
        padded.parse::<u64>().map_err(|_| invalid())?
    };

    whole_units
        .checked_mul(UNITS_PER_COIN)
        .and_then(|units| units.checked_add(fraction_units))
        .ok_or_else(|| LedgerError::Parse(format!("Coin amount {input:?} overflows")))
}

/// Formats base units as a coin string with eight decimals
///
/// # Examples
/// ```
/// use utxo_chain::core::monetary::format_amount;
/// assert_eq!(format_amount(100_000_000), "1.00000000");
/// assert_eq!(format_amount(1_000), "0.00001000");
/// ```
pub fn format_amount(units: u64) -> String {
    format!(
        "{}.{:0width$}",
        units / UNITS_PER_COIN,
        units % UNITS_PER_COIN,
        width = COIN_DECIMALS
    )
}
