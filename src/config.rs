use alloy::primitives::{Address, U256};
use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::agent::CommitmentSettings;
use crate::coordinator::CoordinatorConfig;
use crate::domain::PoolKey;
use crate::strategy::{StrategyKind, StrategySettings, TradingLimits};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub agent_id: String,
    pub chain_id: u64,
    pub rpc_url: String,
    pub hook_address: String,
    pub pool_manager_address: String,
    pub pools: Vec<PoolConfig>,
    #[serde(default)]
    pub commitment: CommitmentSettings,
    #[serde(default)]
    pub monitoring: MonitoringSettings,
    pub trading: TradingSettings,
    pub strategy: StrategySection,
    #[serde(default)]
    pub coordinator: CoordinatorConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Never send transactions; synthetic receipts only
    #[serde(default)]
    pub dry_run: bool,
    /// Commit with proofs and execute through the proof-verified path
    #[serde(default)]
    pub zk_mode: bool,
}

/// One pool the agent trades; the hook address comes from the top level
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PoolConfig {
    pub currency0: String,
    pub currency1: String,
    pub fee: u32,
    pub tick_spacing: i32,
}

impl PoolConfig {
    pub fn to_pool_key(&self, hooks: Address) -> Result<PoolKey, String> {
        let currency0 = Address::from_str(self.currency0.trim())
            .map_err(|e| format!("invalid currency0 {}: {e}", self.currency0))?;
        let currency1 = Address::from_str(self.currency1.trim())
            .map_err(|e| format!("invalid currency1 {}: {e}", self.currency1))?;
        Ok(PoolKey::new(
            currency0,
            currency1,
            self.fee,
            self.tick_spacing,
            hooks,
        ))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MonitoringSettings {
    pub poll_interval_ms: u64,
    pub max_retries: u32,
    pub retry_delay_ms: u64,
    /// Pause between successive reveal submissions
    #[serde(default)]
    pub submission_delay_ms: u64,
    /// Pause after reveal submission before the execute call
    #[serde(default = "default_post_reveal_delay_ms")]
    pub post_reveal_delay_ms: u64,
    /// Market cache TTL
    #[serde(default = "default_market_ttl_s")]
    pub market_ttl_s: i64,
    /// Market refresh cadence
    #[serde(default = "default_market_refresh_ms")]
    pub market_refresh_ms: u64,
}

fn default_post_reveal_delay_ms() -> u64 {
    2_000
}

fn default_market_ttl_s() -> i64 {
    300
}

fn default_market_refresh_ms() -> u64 {
    15_000
}

impl Default for MonitoringSettings {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5_000,
            max_retries: 3,
            retry_delay_ms: 1_000,
            submission_delay_ms: 0,
            post_reveal_delay_ms: default_post_reveal_delay_ms(),
            market_ttl_s: default_market_ttl_s(),
            market_refresh_ms: default_market_refresh_ms(),
        }
    }
}

/// Amount bounds come in as decimal (or 0x-prefixed hex) strings so a bad
/// value is a config error, not a silent truncation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradingSettings {
    pub max_amount_in: String,
    pub min_amount_in: String,
    pub default_slippage_bps: u32,
}

impl TradingSettings {
    pub fn to_limits(&self) -> Result<TradingLimits, String> {
        let min_amount_in = U256::from_str(self.min_amount_in.trim())
            .map_err(|e| format!("min_amount_in not a non-negative integer: {e}"))?;
        let max_amount_in = U256::from_str(self.max_amount_in.trim())
            .map_err(|e| format!("max_amount_in not a non-negative integer: {e}"))?;
        Ok(TradingLimits {
            min_amount_in,
            max_amount_in,
            default_slippage_bps: self.default_slippage_bps,
        })
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct StrategySection {
    pub name: StrategyKind,
    #[serde(flatten)]
    pub settings: StrategySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load configuration from files and environment
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from("config")
    }

    /// Load from either a config directory or a single TOML file
    pub fn load_from<P: AsRef<Path>>(config_dir: P) -> Result<Self, ConfigError> {
        let config_path = config_dir.as_ref();

        let mut builder = Config::builder()
            .set_default("logging.level", "info")?
            .set_default("logging.json", false)?
            .set_default("trading.default_slippage_bps", 50)?;

        if config_path.is_file() {
            builder = builder.add_source(File::from(config_path).required(true));
        } else {
            builder = builder
                .add_source(File::from(config_path.join("default.toml")).required(false))
                .add_source(
                    File::from(config_path.join(
                        std::env::var("UMBRA_ENV").unwrap_or_else(|_| "development".to_string()),
                    ))
                    .required(false),
                );
        }

        builder = builder.add_source(
            // Override with environment variables (UMBRA_TRADING__MAX_AMOUNT_IN, etc.)
            Environment::with_prefix("UMBRA")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        builder.build()?.try_deserialize()
    }

    pub fn hook_address(&self) -> Result<Address, String> {
        Address::from_str(self.hook_address.trim())
            .map_err(|e| format!("invalid hook_address {}: {e}", self.hook_address))
    }

    pub fn pool_manager_address(&self) -> Result<Address, String> {
        Address::from_str(self.pool_manager_address.trim())
            .map_err(|e| format!("invalid pool_manager_address {}: {e}", self.pool_manager_address))
    }

    /// Resolve all configured pools against the hook address
    pub fn pool_keys(&self) -> Result<Vec<PoolKey>, String> {
        let hooks = self.hook_address()?;
        self.pools.iter().map(|p| p.to_pool_key(hooks)).collect()
    }

    /// Validate config invariants. Returns list of problems (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.agent_id.trim().is_empty() {
            errors.push("agent_id must not be empty".to_string());
        }
        if self.pools.is_empty() {
            errors.push("at least one pool must be configured".to_string());
        }
        if let Err(e) = self.hook_address() {
            errors.push(e);
        }
        if let Err(e) = self.pool_manager_address() {
            errors.push(e);
        }
        for pool in &self.pools {
            if let Err(e) = pool.to_pool_key(Address::ZERO) {
                errors.push(e);
            }
        }

        match self.trading.to_limits() {
            Ok(limits) => {
                if limits.min_amount_in > limits.max_amount_in {
                    errors.push(format!(
                        "min_amount_in {} exceeds max_amount_in {}",
                        limits.min_amount_in, limits.max_amount_in
                    ));
                }
                if limits.default_slippage_bps > 10_000 {
                    errors.push(format!(
                        "default_slippage_bps must be <= 10000, got {}",
                        limits.default_slippage_bps
                    ));
                }
            }
            Err(e) => errors.push(e),
        }

        if self.coordinator.quorum == 0 {
            errors.push("coordinator.quorum must be >= 1".to_string());
        }
        if self.commitment.default_deadline_offset_s == 0 {
            errors.push("commitment.default_deadline_offset_s must be > 0".to_string());
        }

        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> AppConfig {
        AppConfig {
            agent_id: "agent-1".to_string(),
            chain_id: 1,
            rpc_url: "http://localhost:8545".to_string(),
            hook_address: "0x3333333333333333333333333333333333333333".to_string(),
            pool_manager_address: "0x4444444444444444444444444444444444444444".to_string(),
            pools: vec![PoolConfig {
                currency0: "0x1111111111111111111111111111111111111111".to_string(),
                currency1: "0x2222222222222222222222222222222222222222".to_string(),
                fee: 3000,
                tick_spacing: 60,
            }],
            commitment: CommitmentSettings::default(),
            monitoring: MonitoringSettings::default(),
            trading: TradingSettings {
                max_amount_in: "1000000000000000000".to_string(),
                min_amount_in: "10000000000000000".to_string(),
                default_slippage_bps: 50,
            },
            strategy: StrategySection {
                name: StrategyKind::Momentum,
                settings: StrategySettings::default(),
            },
            coordinator: CoordinatorConfig::default(),
            logging: LoggingConfig::default(),
            dry_run: true,
            zk_mode: false,
        }
    }

    #[test]
    fn sample_config_is_valid() {
        let config = sample();
        assert!(config.validate().is_empty());
        assert_eq!(config.pool_keys().unwrap().len(), 1);
        let limits = config.trading.to_limits().unwrap();
        assert!(limits.min_amount_in < limits.max_amount_in);
    }

    #[test]
    fn bad_amounts_and_addresses_are_reported() {
        let mut config = sample();
        config.trading.min_amount_in = "not-a-number".to_string();
        config.hook_address = "0x123".to_string();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("min_amount_in")));
        assert!(errors.iter().any(|e| e.contains("hook_address")));
    }

    #[test]
    fn inverted_amount_bounds_are_reported() {
        let mut config = sample();
        config.trading.min_amount_in = "2000000000000000000".to_string();
        let errors = config.validate();
        assert!(errors.iter().any(|e| e.contains("exceeds max_amount_in")));
    }

    #[test]
    fn zero_quorum_is_reported() {
        let mut config = sample();
        config.coordinator.quorum = 0;
        assert!(config
            .validate()
            .iter()
            .any(|e| e.contains("quorum")));
    }
}
