//! umbra — off-chain coordination and execution core for a private
//! batch-swap AMM hook

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use tokio::sync::broadcast;
use tracing::info;
use tracing_subscriber::EnvFilter;

use umbra::agent::{AgentManager, TradingAgent};
use umbra::config::{AppConfig, LoggingConfig};
use umbra::coordinator::BatchCoordinator;
use umbra::domain::NullProofGenerator;
use umbra::executor::{BatchExecutor, ExecutorConfig};
use umbra::hook::{HookApi, HookClient};
use umbra::market::{MarketDataFetcher, MarketDataSource, PoolMonitor, SimulatedMarketSource};
use umbra::reveal::RevealManager;
use umbra::signing::Wallet;
use umbra::strategy::build_strategy;

#[derive(Parser)]
#[command(name = "umbra", about = "Private batch-swap trading agents", version)]
struct Cli {
    /// Config directory or TOML file
    #[arg(long, default_value = "config")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the agent, coordinator, and executor
    Run {
        /// Force dry-run regardless of config
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate the configuration and exit
    CheckConfig,
}

fn init_tracing(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.clone()));
    if logging.json {
        tracing_subscriber::fmt()
            .with_env_filter(filter)
            .json()
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = AppConfig::load_from(&cli.config)
        .with_context(|| format!("loading config from {}", cli.config.display()))?;
    init_tracing(&config.logging);

    match cli.command {
        Command::CheckConfig => check_config(&config),
        Command::Run { dry_run } => run(config, dry_run).await,
    }
}

fn check_config(config: &AppConfig) -> anyhow::Result<()> {
    let problems = config.validate();
    if problems.is_empty() {
        println!("config ok: {} pool(s), strategy {}", config.pools.len(), config.strategy.name);
        Ok(())
    } else {
        for problem in &problems {
            eprintln!("config error: {problem}");
        }
        bail!("{} config problem(s)", problems.len());
    }
}

async fn run(config: AppConfig, dry_run_flag: bool) -> anyhow::Result<()> {
    let problems = config.validate();
    if !problems.is_empty() {
        bail!("invalid config: {}", problems.join("; "));
    }

    let dry_run = config.dry_run || dry_run_flag;
    let hook_address = config.hook_address().map_err(|e| anyhow::anyhow!(e))?;
    let limits = config.trading.to_limits().map_err(|e| anyhow::anyhow!(e))?;
    let pool_keys = config.pool_keys().map_err(|e| anyhow::anyhow!(e))?;

    let wallet = if dry_run {
        Wallet::ephemeral(config.chain_id)
    } else {
        Wallet::from_env(config.chain_id)?
    };
    info!(agent_id = %config.agent_id, address = %wallet.address(), dry_run, "starting");

    let hook: Arc<dyn HookApi> = if dry_run {
        Arc::new(HookClient::dry_run(hook_address))
    } else {
        Arc::new(HookClient::connect(&config.rpc_url, hook_address, &wallet).await?)
    };

    let reveals = Arc::new(
        RevealManager::new(hook.clone())
            .with_submission_delay(config.monitoring.submission_delay_ms),
    );
    let (coordinator, event_rx) = BatchCoordinator::new(config.coordinator.clone());
    let executor = BatchExecutor::new(
        hook.clone(),
        reveals.clone(),
        ExecutorConfig {
            poll_interval_ms: config.monitoring.poll_interval_ms,
            post_reveal_delay_ms: config.monitoring.post_reveal_delay_ms,
            max_retries: config.monitoring.max_retries,
            retry_base_delay_ms: config.monitoring.retry_delay_ms,
            zk_mode: config.zk_mode,
        },
    );
    for key in &pool_keys {
        executor.add_pool(*key).await;
    }

    // Ingestion is a collaborator; the simulated source stands in until an
    // indexer adapter is wired here
    let source: Arc<dyn MarketDataSource> = Arc::new(SimulatedMarketSource::default());
    let fetcher = Arc::new(MarketDataFetcher::new(source, config.monitoring.market_ttl_s));
    let (monitor, market_rx) = PoolMonitor::new(fetcher, config.monitoring.market_refresh_ms);
    for key in &pool_keys {
        monitor.add_pool(*key).await;
    }

    let strategy = build_strategy(config.strategy.name, &config.strategy.settings);
    let mut trading_agent = TradingAgent::new(
        config.agent_id.clone(),
        Arc::new(wallet),
        strategy,
        hook.clone(),
        reveals.clone(),
        coordinator.clone(),
        executor.clone(),
        limits,
        config.commitment.clone(),
    );
    if config.zk_mode {
        trading_agent = trading_agent.with_proof_generator(Arc::new(NullProofGenerator));
    }

    let mut manager = AgentManager::new(coordinator.clone(), executor.clone(), event_rx, market_rx);
    manager.add_agent(trading_agent).await;

    monitor.start().await;

    let (shutdown_tx, shutdown_rx) = broadcast::channel(1);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("interrupt received, shutting down");
            let _ = shutdown_tx.send(());
        }
    });

    manager.run(shutdown_rx).await;
    monitor.stop().await;
    Ok(())
}
