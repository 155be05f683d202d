//! Market data layer: TTL-cached fetching and periodic pool monitoring

pub mod fetcher;
pub mod monitor;
pub mod sim;

pub use fetcher::{calculate_volume, MarketDataFetcher, MarketDataSource};
pub use monitor::PoolMonitor;
pub use sim::SimulatedMarketSource;
