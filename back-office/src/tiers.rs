//! Gear tier lookup and yield projection
//!
//! Tiers bracket an investment amount into a rate-of-return range.
//! Ranges are lower-inclusive, upper-exclusive. The lookup is a pure
//! function; nothing in the ledger reads it to credit anyone.

use ledger_store::GearTier;
use rust_decimal::Decimal;

/// Find the tier whose `[min_quantity, max_quantity)` range contains
/// `amount`. `None` when the amount falls outside every tier.
pub fn lookup_tier(tiers: &[GearTier], amount: Decimal) -> Option<&GearTier> {
    tiers
        .iter()
        .find(|tier| amount >= tier.min_quantity && amount < tier.max_quantity)
}

/// Project a daily ETH yield for an investment.
///
/// `rate` is an administrative choice and is clamped into the tier's
/// rate range before use. Returns zero when `eth_price` is not
/// positive.
pub fn daily_yield(tier: &GearTier, amount: Decimal, rate: Decimal, eth_price: Decimal) -> Decimal {
    if eth_price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let rate = rate.clamp(tier.min_rate, tier.max_rate);
    amount * rate / eth_price
}
