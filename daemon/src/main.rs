//! Agora governance daemon.

mod config;
mod shutdown;
mod sweep;

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use agora_governance::{GovernanceFacade, ReceiptEscrow, SnapshotBalances};
use agora_rpc::{AppState, RpcMetrics, RpcServer};
use agora_store_lmdb::LmdbEnvironment;
use agora_types::SystemClock;
use agora_utils::{init_logging, LogFormat};
use anyhow::Context;
use clap::Parser;

use crate::config::DaemonConfig;
use crate::shutdown::ShutdownController;

/// Named LMDB databases plus headroom.
const MAX_DBS: u32 = 8;

#[derive(Parser)]
#[command(name = "agora-daemon", about = "Agora marketplace governance service")]
struct Cli {
    /// Path to a TOML configuration file. File settings are the base;
    /// CLI flags and env vars override them.
    #[arg(long, env = "AGORA_CONFIG")]
    config: Option<PathBuf>,

    /// Data directory for the LMDB environment.
    #[arg(long, env = "AGORA_DATA_DIR")]
    data_dir: Option<PathBuf>,

    /// HTTP API port.
    #[arg(long, env = "AGORA_PORT")]
    port: Option<u16>,

    /// Log format: "human" or "json".
    #[arg(long, env = "AGORA_LOG_FORMAT")]
    log_format: Option<LogFormat>,

    /// Log filter, e.g. "info" or "debug,agora_store_lmdb=trace".
    #[arg(long, env = "AGORA_LOG_LEVEL")]
    log_level: Option<String>,

    /// Seconds between expiry sweeps (0 disables).
    #[arg(long, env = "AGORA_SWEEP_INTERVAL")]
    sweep_interval_secs: Option<u64>,

    /// Minimum participating weight for a binding outcome.
    #[arg(long, env = "AGORA_QUORUM_THRESHOLD")]
    quorum_threshold: Option<u64>,

    /// Minimum escrowed deposit to open a proposal.
    #[arg(long, env = "AGORA_MIN_DEPOSIT")]
    min_deposit: Option<u64>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Subcommand)]
enum Command {
    /// Run the service.
    Run,
    /// Print the effective configuration as TOML and exit.
    Config,
}

impl Cli {
    fn resolve_config(&self) -> anyhow::Result<DaemonConfig> {
        let mut config = match &self.config {
            Some(path) => DaemonConfig::from_toml_file(path)?,
            None => DaemonConfig::default(),
        };
        if let Some(dir) = &self.data_dir {
            config.data_dir = dir.clone();
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(format) = self.log_format {
            config.log_format = format;
        }
        if let Some(level) = &self.log_level {
            config.log_level = level.clone();
        }
        if let Some(secs) = self.sweep_interval_secs {
            config.sweep_interval_secs = secs;
        }
        if let Some(threshold) = self.quorum_threshold {
            config.governance.quorum_threshold = threshold;
        }
        if let Some(deposit) = self.min_deposit {
            config.governance.min_deposit = deposit;
        }
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let config = cli.resolve_config()?;

    match cli.command {
        Command::Config => {
            print!("{}", config.to_toml_string()?);
            Ok(())
        }
        Command::Run => run(config).await,
    }
}

async fn run(config: DaemonConfig) -> anyhow::Result<()> {
    init_logging(config.log_format, &config.log_level)
        .map_err(|e| anyhow::anyhow!("failed to initialise logging: {e}"))?;

    let env = LmdbEnvironment::open(&config.data_dir, MAX_DBS, config.map_size)
        .with_context(|| format!("opening data dir {}", config.data_dir.display()))?;

    let balances: SnapshotBalances = config
        .balances
        .iter()
        .map(|b| (b.address.clone(), b.weight))
        .collect();
    let escrow = ReceiptEscrow::new(config.escrow_receipts.iter().cloned());
    tracing::info!(
        accounts = balances.len(),
        receipts = escrow.len(),
        quorum_threshold = config.governance.quorum_threshold,
        min_deposit = config.governance.min_deposit,
        "governance configured"
    );

    let facade = Arc::new(GovernanceFacade::new(
        Arc::new(env.governance_store()),
        Arc::new(SystemClock),
        Arc::new(balances),
        Arc::new(escrow),
        config.governance.clone(),
    ));
    let metrics = Arc::new(
        RpcMetrics::new().map_err(|e| anyhow::anyhow!("registering metrics: {e}"))?,
    );
    let shutdown = Arc::new(ShutdownController::new());

    let sweeper = (config.sweep_interval_secs > 0).then(|| {
        tokio::spawn(sweep::run_sweeper(
            Arc::clone(&facade),
            Duration::from_secs(config.sweep_interval_secs),
            shutdown.subscribe(),
        ))
    });

    let signals = {
        let shutdown = Arc::clone(&shutdown);
        tokio::spawn(async move { shutdown.wait_for_signal().await })
    };

    let mut server_stop = shutdown.subscribe();
    let server = RpcServer::new(config.port, AppState::new(Arc::clone(&facade), metrics));
    let served = server
        .serve(async move {
            let _ = server_stop.recv().await;
        })
        .await;

    // Stop the other tasks too if the server exited on its own.
    shutdown.shutdown();
    signals.abort();
    if let Some(sweeper) = sweeper {
        let _ = sweeper.await;
    }

    env.force_sync().context("flushing LMDB")?;
    tracing::info!(stats = ?facade.stats().snapshot(), "agora daemon exited");
    served.map_err(Into::into)
}
