/// This module runs a deployment from start to finish: load the artifact,
/// connect to the network, deploy, and verify.
use std::{fmt, future::Future, sync::Arc};

use contract_artifacts::ArtifactRegistry;
use ethers::{
    abi::Token,
    providers::Middleware,
    types::{Address, TxHash, U64},
};
use network_profiles::NetworkProfile;
use tokio_util::sync::CancellationToken;
use tracing::info;

use crate::{
    chain::Chain,
    error::DeployError,
    executor::deploy,
    factory::{find_artifact, parse_constructor_args, ContractFactory, TxOverrides},
    verifier::{verify, VerificationResult},
};

/// Everything needed to deploy one contract to one network.
#[derive(Clone, Debug)]
pub struct DeploymentRequest {
    artifact_name: String,
    constructor_arguments: Vec<Token>,
    target_network: NetworkProfile,
    overrides: TxOverrides,
}

impl DeploymentRequest {
    pub fn new(
        artifact_name: impl Into<String>,
        constructor_arguments: Vec<Token>,
        target_network: NetworkProfile,
        overrides: TxOverrides,
    ) -> Self {
        Self {
            artifact_name: artifact_name.into(),
            constructor_arguments,
            target_network,
            overrides,
        }
    }

    /// Builds a request from textual constructor arguments. The arguments
    /// are checked against the artifact's constructor.
    pub fn parse(
        registry: &ArtifactRegistry,
        artifact_name: &str,
        values: &[String],
        target_network: NetworkProfile,
        overrides: TxOverrides,
    ) -> Result<Self, DeployError> {
        let artifact = find_artifact(registry, artifact_name)?;
        let constructor_arguments = parse_constructor_args(artifact, values)?;
        Ok(Self::new(
            artifact_name,
            constructor_arguments,
            target_network,
            overrides,
        ))
    }

    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    pub fn constructor_arguments(&self) -> &[Token] {
        &self.constructor_arguments
    }

    pub fn target_network(&self) -> &NetworkProfile {
        &self.target_network
    }

    pub fn overrides(&self) -> &TxOverrides {
        &self.overrides
    }
}

/// The outcome of a successful run.
#[derive(Clone, Debug)]
pub struct DeploymentReport {
    pub network: String,
    pub artifact_name: String,
    pub address: Address,
    pub tx_hash: TxHash,
    pub block_number: Option<U64>,
    pub verification: VerificationResult,
}

impl fmt::Display for DeploymentReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{} deployed to {:?} on {}",
            self.artifact_name, self.address, self.network
        )?;
        write!(f, "transaction {:?}", self.tx_hash)?;
        if let Some(block_number) = self.block_number {
            write!(f, " in block {block_number}")?;
        }
        Ok(())
    }
}

/// Deploys the requested artifact and calls `verify_method` on it. The
/// client only lives for the duration of the run. Without a signer the
/// deployment is sent from the node's first unlocked account.
pub async fn run(
    registry: &ArtifactRegistry,
    request: &DeploymentRequest,
    verify_method: &str,
    cancel: &CancellationToken,
) -> Result<DeploymentReport, DeployError> {
    // The signer is resolved before anything talks to the network.
    let factory = ContractFactory::load(
        registry,
        request.artifact_name(),
        request.target_network(),
    )?;
    let chain = Chain::connect(request.target_network())?;
    match factory.signer() {
        Some(signer) => {
            let client = until_cancelled(cancel, chain.client(signer.clone())).await?;
            run_with_client(client, &factory, request, verify_method, cancel).await
        }
        None => {
            let client = until_cancelled(cancel, chain.unlocked_client()).await?;
            run_with_client(client, &factory, request, verify_method, cancel).await
        }
    }
}

async fn until_cancelled<T>(
    cancel: &CancellationToken,
    connect: impl Future<Output = Result<T, DeployError>>,
) -> Result<T, DeployError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(DeployError::Cancelled { tx_hash: None }),
        result = connect => result,
    }
}

/// Runs the deploy and verify stages with an existing client.
pub async fn run_with_client<M: Middleware + 'static>(
    client: Arc<M>,
    factory: &ContractFactory,
    request: &DeploymentRequest,
    verify_method: &str,
    cancel: &CancellationToken,
) -> Result<DeploymentReport, DeployError> {
    let deployed = deploy(
        client,
        factory,
        request.constructor_arguments(),
        request.overrides(),
        cancel,
    )
    .await?;
    let verification = verify(&deployed, verify_method).await?;
    info!(
        network = deployed.network(),
        artifact = deployed.artifact_name(),
        address = ?deployed.address(),
        "deployment finished"
    );

    Ok(DeploymentReport {
        network: deployed.network().to_string(),
        artifact_name: deployed.artifact_name().to_string(),
        address: deployed.address(),
        tx_hash: deployed.tx_hash(),
        block_number: deployed.block_number(),
        verification,
    })
}
