//! Strategy runtime: decision kernel and the four built-in strategies

pub mod arbitrage;
pub mod liquidity;
pub mod mean_reversion;
pub mod momentum;
pub mod toolkit;
pub mod traits;

pub use arbitrage::{ArbitrageConfig, ArbitrageStrategy, ReferencePrice};
pub use liquidity::{LiquidityConfig, LiquidityStrategy};
pub use mean_reversion::{MeanReversionConfig, MeanReversionStrategy};
pub use momentum::{MomentumConfig, MomentumStrategy};
pub use toolkit::{
    clamp_amount, confidence_from_magnitude, direction_from_change, expected_amount_out,
    min_amount_out, price_to_wad, scale_amount, validate_market_data, CooldownTracker,
    MarketDataReport, TradingLimits,
};
pub use traits::{Strategy, StrategyKind};

/// Per-strategy configuration blocks; only the selected one is used
#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct StrategySettings {
    #[serde(default)]
    pub momentum: Option<MomentumConfig>,
    #[serde(default)]
    pub arbitrage: Option<ArbitrageConfig>,
    #[serde(default)]
    pub liquidity: Option<LiquidityConfig>,
    #[serde(default)]
    pub mean_reversion: Option<MeanReversionConfig>,
}

/// Instantiate the configured strategy, falling back to each strategy's
/// defaults when its block is omitted
pub fn build_strategy(kind: StrategyKind, settings: &StrategySettings) -> Box<dyn Strategy> {
    match kind {
        StrategyKind::Momentum => Box::new(MomentumStrategy::new(
            settings.momentum.clone().unwrap_or_default(),
        )),
        StrategyKind::Arbitrage => Box::new(ArbitrageStrategy::new(
            settings.arbitrage.clone().unwrap_or_default(),
        )),
        StrategyKind::Liquidity => Box::new(LiquidityStrategy::new(
            settings.liquidity.clone().unwrap_or_default(),
        )),
        StrategyKind::MeanReversion => Box::new(MeanReversionStrategy::new(
            settings.mean_reversion.clone().unwrap_or_default(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_covers_every_kind() {
        let settings = StrategySettings::default();
        for kind in [
            StrategyKind::Momentum,
            StrategyKind::Arbitrage,
            StrategyKind::Liquidity,
            StrategyKind::MeanReversion,
        ] {
            let strategy = build_strategy(kind, &settings);
            assert_eq!(strategy.name(), kind.as_str());
        }
    }
}
