use std::{
    future::{pending, Future},
    io,
    path::PathBuf,
    time::Duration,
};

use clap::Parser;
use contract_artifacts::ArtifactRegistry;
use deploy_utils::{run, DeployError, DeploymentRequest, TxOverrides};
use ethers::types::U256;
use eyre::Result;
use network_profiles::{resolve, Environment, LOCALHOST};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

/// Deploys a compiled contract and calls a read-only method on it.
#[derive(Debug, Parser)]
#[command(version)]
struct Args {
    /// The network to deploy to.
    #[arg(long, default_value = LOCALHOST)]
    network: String,
    /// The build output directory (Foundry's `out` or Hardhat's `artifacts`).
    #[arg(long, default_value = "out")]
    artifacts: PathBuf,
    /// The name of the contract to deploy.
    #[arg(long, default_value = "StakingRewards")]
    contract: String,
    /// A constructor argument. Repeat for each argument in order.
    #[arg(long = "arg")]
    args: Vec<String>,
    /// The no-argument method to call once the contract is deployed.
    #[arg(long, default_value = "hello")]
    verify_method: String,
    #[arg(long)]
    gas_limit: Option<u64>,
    /// The gas price in wei. Setting this sends a legacy transaction.
    #[arg(long)]
    gas_price: Option<u64>,
    /// Seconds to wait for the deployment before giving up.
    #[arg(long)]
    timeout: Option<u64>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // A missing .env file is fine since everything can come from the
    // environment.
    if let Err(err) = dotenvy::dotenv() {
        if !err.not_found() {
            return Err(err.into());
        }
    }
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let cancel = CancellationToken::new();
    spawn_cancellation(cancel.clone(), args.timeout.map(Duration::from_secs));

    match deploy(&args, &cancel).await {
        Ok(()) => Ok(()),
        Err(err) => {
            error!(stage = %err.stage(), "deployment failed");
            Err(err.into())
        }
    }
}

async fn deploy(args: &Args, cancel: &CancellationToken) -> Result<(), DeployError> {
    let environment = Environment::from_env()?;
    let networks = resolve(&environment);
    let network = networks.get(&args.network)?.clone();
    let registry = ArtifactRegistry::from_dir(&args.artifacts)?;
    info!(
        artifacts = %args.artifacts.display(),
        count = registry.len(),
        "loaded artifacts"
    );

    let overrides = TxOverrides {
        gas_limit: args.gas_limit.map(U256::from),
        gas_price: args.gas_price.map(U256::from),
    };
    let request =
        DeploymentRequest::parse(&registry, &args.contract, &args.args, network, overrides)?;
    let report = run(&registry, &request, &args.verify_method, cancel).await?;

    println!("{report}");
    println!("{}", report.verification);

    Ok(())
}

/// Cancels the token on Ctrl-C or once the timeout elapses.
fn spawn_cancellation(cancel: CancellationToken, timeout: Option<Duration>) {
    tokio::spawn(async move {
        wait_for_cancellation(tokio::signal::ctrl_c(), timeout).await;
        cancel.cancel();
    });
}

/// Resolves on Ctrl-C or once the timeout elapses. If the Ctrl-C listener
/// can't be installed, only the timeout is waited for.
async fn wait_for_cancellation(
    ctrl_c: impl Future<Output = io::Result<()>>,
    timeout: Option<Duration>,
) {
    let ctrl_c = async {
        match ctrl_c.await {
            Ok(()) => info!("received ctrl-c"),
            Err(err) => {
                warn!(%err, "failed to listen for ctrl-c");
                pending::<()>().await;
            }
        }
    };
    let timeout = async {
        match timeout {
            Some(timeout) => sleep(timeout).await,
            None => pending().await,
        }
    };
    tokio::select! {
        _ = ctrl_c => {}
        _ = timeout => warn!("timed out waiting for the deployment"),
    }
}
