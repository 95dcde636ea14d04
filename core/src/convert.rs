//! Conversion between asset amounts and payment-channel units

use crate::error::LacError;
use crate::traits::LacResult;
use crate::types::Sats;

/// Satoshis per bitcoin
pub const SATS_PER_UNIT: u64 = 100_000_000;

/// Convert `percent` of `amount` of an asset priced at `price` into satoshis.
///
/// `round((amount / price) * SATS_PER_UNIT / 100 * percent)`, rounding half
/// away from zero.
pub fn percent_of_asset_to_sats(amount: f64, price: f64, percent: f64) -> LacResult<Sats> {
    if !(price.is_finite() && price > 0.0) {
        return Err(LacError::PriceUnavailable(format!(
            "can not convert with price {}",
            price
        )));
    }
    if !amount.is_finite() || amount < 0.0 {
        return Err(LacError::InvalidArgument(format!("invalid amount {}", amount)));
    }
    if !percent.is_finite() || percent < 0.0 {
        return Err(LacError::InvalidArgument(format!("invalid percentage {}", percent)));
    }

    let amount_sat = (amount / price) * SATS_PER_UNIT as f64;
    let rounded = (amount_sat / 100.0 * percent).round();

    if !rounded.is_finite() || rounded > u64::MAX as f64 {
        return Err(LacError::InvalidArgument(format!(
            "{} of {} at price {} overflows",
            percent, amount, price
        )));
    }

    Ok(Sats(rounded as u64))
}
