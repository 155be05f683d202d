//! Shared strategy toolkit
//!
//! Market-data validation, cooldown tracking, bounded position sizing,
//! and the slippage-protected minimum-output computation. Token amounts
//! stay in U256 end to end; floats appear only in percentage deltas and
//! confidences.

use std::collections::HashMap;

use alloy::primitives::{B256, U256};
use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::{MarketData, SwapDirection};

/// Bounded position sizing and default slippage shared by every strategy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingLimits {
    pub min_amount_in: U256,
    pub max_amount_in: U256,
    pub default_slippage_bps: u32,
}

impl Default for TradingLimits {
    fn default() -> Self {
        Self {
            min_amount_in: U256::from(10u64.pow(16)), // 0.01 token
            max_amount_in: U256::from(10u64.pow(18)), // 1 token
            default_slippage_bps: 50,
        }
    }
}

/// Outcome of validating a market snapshot
#[derive(Debug, Clone, Default)]
pub struct MarketDataReport {
    pub is_valid: bool,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

/// Validate a snapshot before any strategy logic runs.
///
/// Errors make the snapshot unusable; warnings are advisory (stale data,
/// extreme moves, empty pool).
pub fn validate_market_data(market: &MarketData) -> MarketDataReport {
    let mut errors = Vec::new();
    let mut warnings = Vec::new();

    if market.pool_id == B256::ZERO {
        errors.push("missing pool id".to_string());
    }
    if market.current_price <= Decimal::ZERO {
        errors.push(format!(
            "current price must be positive, got {}",
            market.current_price
        ));
    }
    if !market.price_change_1h.is_finite() || !market.price_change_24h.is_finite() {
        errors.push("price change is not a finite number".to_string());
    }

    if market.is_stale() {
        warnings.push(format!(
            "market data is stale ({}s old)",
            market.age().num_seconds()
        ));
    }
    if market.price_change_1h.abs() > 100.0 || market.price_change_24h.abs() > 200.0 {
        warnings.push(format!(
            "extreme price change: 1h={:.2}% 24h={:.2}%",
            market.price_change_1h, market.price_change_24h
        ));
    }
    if market.total_liquidity.is_zero() {
        warnings.push("pool has zero total liquidity".to_string());
    }

    MarketDataReport {
        is_valid: errors.is_empty(),
        errors,
        warnings,
    }
}

/// Per-(strategy instance, pool) cooldown clock
#[derive(Debug, Clone, Default)]
pub struct CooldownTracker {
    last_trade: HashMap<B256, DateTime<Utc>>,
}

impl CooldownTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stamp the clock for a pool
    pub fn record_trade(&mut self, pool_id: B256) {
        self.last_trade.insert(pool_id, Utc::now());
    }

    /// True while `now - last_trade < cooldown`
    pub fn is_active(&self, pool_id: B256, cooldown: Duration) -> bool {
        self.last_trade
            .get(&pool_id)
            .map(|last| Utc::now() - *last < cooldown)
            .unwrap_or(false)
    }

    pub fn clear(&mut self) {
        self.last_trade.clear();
    }
}

/// Linearly map a factor in [0, 1] onto the configured amount range.
///
/// The factor is quantized to hundredths before touching the big-integer
/// range, so no floating intermediate carries amount precision.
pub fn scale_amount(factor: f64, limits: &TradingLimits) -> U256 {
    let clamped = if factor.is_finite() {
        factor.clamp(0.0, 1.0)
    } else {
        0.0
    };
    let hundredths = U256::from((clamped * 100.0).floor() as u64);
    let span = limits.max_amount_in.saturating_sub(limits.min_amount_in);
    limits.min_amount_in + span * hundredths / U256::from(100u64)
}

/// Clamp an amount into the configured range
pub fn clamp_amount(amount: U256, limits: &TradingLimits) -> U256 {
    amount.clamp(limits.min_amount_in, limits.max_amount_in)
}

/// 10^18, the fixed-point scale prices are quoted at on chain
fn wad() -> U256 {
    U256::from(10u64.pow(18))
}

/// Floor-toward-zero conversion of a decimal price to 1e18 fixed point.
/// Non-positive or overflowing prices map to zero.
pub fn price_to_wad(price: Decimal) -> U256 {
    if price <= Decimal::ZERO {
        return U256::ZERO;
    }
    let scaled = match price.checked_mul(Decimal::from(10u64.pow(18))) {
        Some(s) => s.trunc(),
        None => return U256::ZERO,
    };
    scaled
        .to_u128()
        .map(U256::from)
        .unwrap_or(U256::ZERO)
}

/// a * b / d with integer division; falls back to a split computation on
/// overflow instead of widening
fn mul_div(a: U256, b: U256, d: U256) -> U256 {
    if d.is_zero() {
        return U256::ZERO;
    }
    match a.checked_mul(b) {
        Some(product) => product / d,
        None => {
            let quotient = a / d;
            let remainder = a % d;
            quotient
                .saturating_mul(b)
                .saturating_add(remainder.saturating_mul(b) / d)
        }
    }
}

/// Slippage-protected minimum output for a swap.
///
/// `P = ⌊price · 10^18⌋`; zero when `P ≤ 0`. Zero-for-one expects
/// `amount·P/1e18`, one-for-zero expects `amount·1e18/P`, and the
/// tolerance shaves `slippage_bps` off the expectation with integer
/// division throughout.
pub fn min_amount_out(
    amount_in: U256,
    current_price: Decimal,
    direction: SwapDirection,
    slippage_bps: u32,
) -> U256 {
    let price_wad = price_to_wad(current_price);
    if price_wad.is_zero() {
        return U256::ZERO;
    }

    let expected = match direction {
        SwapDirection::ZeroForOne => mul_div(amount_in, price_wad, wad()),
        SwapDirection::OneForZero => mul_div(amount_in, wad(), price_wad),
    };

    let bps = slippage_bps.min(10_000);
    mul_div(expected, U256::from(10_000 - bps), U256::from(10_000u64))
}

/// Expected risk-free output at the current price, before slippage
pub fn expected_amount_out(
    amount_in: U256,
    current_price: Decimal,
    direction: SwapDirection,
) -> U256 {
    min_amount_out(amount_in, current_price, direction, 0)
}

/// Direction implied by a signed price change; `None` on zero
pub fn direction_from_change(delta: f64) -> Option<SwapDirection> {
    if delta > 0.0 {
        Some(SwapDirection::ZeroForOne)
    } else if delta < 0.0 {
        Some(SwapDirection::OneForZero)
    } else {
        None
    }
}

/// `max(0.1, min(|Δ|/10, 1.0))`
pub fn confidence_from_magnitude(delta_pct: f64) -> f64 {
    (delta_pct.abs() / 10.0).min(1.0).max(0.1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy::primitives::Address;
    use crate::domain::PoolKey;
    use rust_decimal_macros::dec;

    fn limits(min: u64, max: u64) -> TradingLimits {
        TradingLimits {
            min_amount_in: U256::from(min),
            max_amount_in: U256::from(max),
            default_slippage_bps: 50,
        }
    }

    fn snapshot() -> MarketData {
        let pool_key = PoolKey::new(
            Address::repeat_byte(1),
            Address::repeat_byte(2),
            3000,
            60,
            Address::repeat_byte(3),
        );
        MarketData {
            pool_id: pool_key.pool_id(),
            pool_key,
            current_price: dec!(2),
            price_change_1h: 1.0,
            price_change_24h: 2.0,
            total_liquidity: U256::from(1_000_000u64),
            liquidity0: U256::from(500_000u64),
            liquidity1: U256::from(500_000u64),
            volume_1h: U256::from(10_000u64),
            volume_24h: U256::from(100_000u64),
            recent_swaps: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn validation_flags_bad_price() {
        let mut m = snapshot();
        m.current_price = Decimal::ZERO;
        let report = validate_market_data(&m);
        assert!(!report.is_valid);
        assert!(report.errors.iter().any(|e| e.contains("positive")));
    }

    #[test]
    fn validation_warns_on_staleness_and_extremes() {
        let mut m = snapshot();
        m.captured_at = Utc::now() - Duration::seconds(600);
        m.price_change_1h = 150.0;
        m.total_liquidity = U256::ZERO;
        let report = validate_market_data(&m);
        assert!(report.is_valid);
        assert_eq!(report.warnings.len(), 3);
    }

    #[test]
    fn cooldown_window_semantics() {
        let mut tracker = CooldownTracker::new();
        let pool = B256::repeat_byte(0xaa);
        assert!(!tracker.is_active(pool, Duration::seconds(60)));

        tracker.record_trade(pool);
        assert!(tracker.is_active(pool, Duration::seconds(60)));
        // A zero-length window is immediately inactive
        assert!(!tracker.is_active(pool, Duration::zero()));
    }

    #[test]
    fn scale_amount_is_linear_and_clamped() {
        let l = limits(100, 300);
        assert_eq!(scale_amount(0.0, &l), U256::from(100u64));
        assert_eq!(scale_amount(0.5, &l), U256::from(200u64));
        assert_eq!(scale_amount(1.0, &l), U256::from(300u64));
        assert_eq!(scale_amount(2.5, &l), U256::from(300u64));
        assert_eq!(scale_amount(-1.0, &l), U256::from(100u64));
        assert_eq!(scale_amount(f64::NAN, &l), U256::from(100u64));
    }

    #[test]
    fn scale_amount_quantizes_to_hundredths() {
        let l = limits(0, 10_000);
        // 0.339 → 33 hundredths
        assert_eq!(scale_amount(0.339, &l), U256::from(3_300u64));
    }

    #[test]
    fn clamp_amount_bounds() {
        let l = limits(100, 300);
        assert_eq!(clamp_amount(U256::from(50u64), &l), U256::from(100u64));
        assert_eq!(clamp_amount(U256::from(200u64), &l), U256::from(200u64));
        assert_eq!(clamp_amount(U256::from(500u64), &l), U256::from(300u64));
    }

    #[test]
    fn price_to_wad_truncates_toward_zero() {
        assert_eq!(
            price_to_wad(dec!(1.5)),
            U256::from(1_500_000_000_000_000_000u128)
        );
        assert_eq!(price_to_wad(Decimal::ZERO), U256::ZERO);
        assert_eq!(price_to_wad(dec!(-2)), U256::ZERO);
    }

    #[test]
    fn min_out_zero_for_one() {
        let amount = U256::from(10u64.pow(18)); // 1 token0
        // price 2.0, 100 bps tolerance: expect 2.0 out, min 1.98
        let out = min_amount_out(amount, dec!(2), SwapDirection::ZeroForOne, 100);
        assert_eq!(out, U256::from(1_980_000_000_000_000_000u128));
    }

    #[test]
    fn min_out_one_for_zero() {
        let amount = U256::from(10u64.pow(18)); // 1 token1
        // price 2.0: expect 0.5 token0 out, min 0.495 at 100 bps
        let out = min_amount_out(amount, dec!(2), SwapDirection::OneForZero, 100);
        assert_eq!(out, U256::from(495_000_000_000_000_000u128));
    }

    #[test]
    fn min_out_never_exceeds_expected() {
        let amount = U256::from(123_456_789u64);
        for bps in [0u32, 1, 50, 500, 9_999, 10_000] {
            let min = min_amount_out(amount, dec!(1.337), SwapDirection::ZeroForOne, bps);
            let expected = expected_amount_out(amount, dec!(1.337), SwapDirection::ZeroForOne);
            assert!(min <= expected, "bps={bps}");
        }
    }

    #[test]
    fn min_out_zero_iff_zero_price() {
        let amount = U256::from(1_000_000u64);
        assert_eq!(
            min_amount_out(amount, Decimal::ZERO, SwapDirection::ZeroForOne, 0),
            U256::ZERO
        );
        assert!(
            min_amount_out(amount, dec!(0.000001), SwapDirection::ZeroForOne, 0) > U256::ZERO
        );
    }

    #[test]
    fn direction_and_confidence_helpers() {
        assert_eq!(direction_from_change(1.0), Some(SwapDirection::ZeroForOne));
        assert_eq!(direction_from_change(-0.5), Some(SwapDirection::OneForZero));
        assert_eq!(direction_from_change(0.0), None);

        assert_eq!(confidence_from_magnitude(0.0), 0.1);
        assert_eq!(confidence_from_magnitude(5.0), 0.5);
        assert_eq!(confidence_from_magnitude(50.0), 1.0);
    }
}
