/// This module submits deployment transactions and waits for them to be
/// included on-chain.
use std::{fmt, sync::Arc, time::Duration};

use ethers::{
    abi::Token,
    contract::Contract,
    providers::Middleware,
    types::{Address, TransactionReceipt, TxHash, U64},
};
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::{
    error::DeployError,
    factory::{ContractFactory, TxOverrides},
};

/// The lifecycle of a deployment. `Confirmed` and `Failed` are terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeploymentState {
    Pending,
    Submitted,
    Confirmed,
    Failed,
}

impl fmt::Display for DeploymentState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = match self {
            DeploymentState::Pending => "pending",
            DeploymentState::Submitted => "submitted",
            DeploymentState::Confirmed => "confirmed",
            DeploymentState::Failed => "failed",
        };
        write!(f, "{state}")
    }
}

/// A contract whose deployment has been observed on-chain. The contract
/// instance shares the client that deployed it.
pub struct DeployedContract<M> {
    address: Address,
    artifact_name: String,
    network: String,
    tx_hash: TxHash,
    block_number: Option<U64>,
    contract: Contract<M>,
}

impl<M> fmt::Debug for DeployedContract<M> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DeployedContract")
            .field("address", &self.address)
            .field("artifact_name", &self.artifact_name)
            .field("network", &self.network)
            .field("tx_hash", &self.tx_hash)
            .field("block_number", &self.block_number)
            .finish()
    }
}

impl<M: Middleware> DeployedContract<M> {
    pub(crate) fn new(
        address: Address,
        artifact_name: String,
        network: String,
        tx_hash: TxHash,
        block_number: Option<U64>,
        contract: Contract<M>,
    ) -> Self {
        Self {
            address,
            artifact_name,
            network,
            tx_hash,
            block_number,
            contract,
        }
    }

    pub fn address(&self) -> Address {
        self.address
    }

    pub fn artifact_name(&self) -> &str {
        &self.artifact_name
    }

    /// The name of the network the contract was deployed to.
    pub fn network(&self) -> &str {
        &self.network
    }

    /// The hash of the deployment transaction.
    pub fn tx_hash(&self) -> TxHash {
        self.tx_hash
    }

    /// The block the deployment was included in.
    pub fn block_number(&self) -> Option<U64> {
        self.block_number
    }

    pub fn contract(&self) -> &Contract<M> {
        &self.contract
    }
}

/// Deploys the factory's artifact and waits until the deployment is included
/// on-chain. There is no timeout; cancelling the token while waiting stops the
/// wait with `DeployError::Cancelled`. A handle is only returned once the
/// receipt shows a successful deployment.
pub async fn deploy<M: Middleware + 'static>(
    client: Arc<M>,
    factory: &ContractFactory,
    args: &[Token],
    overrides: &TxOverrides,
    cancel: &CancellationToken,
) -> Result<DeployedContract<M>, DeployError> {
    let artifact = factory.artifact().name();
    let network = factory.network().name.as_str();
    info!(
        artifact,
        network,
        deployer = ?client.default_sender(),
        state = %DeploymentState::Pending,
        "preparing deployment"
    );

    let tx = factory.deployment_tx(args, overrides)?;
    if cancel.is_cancelled() {
        return Err(DeployError::Cancelled { tx_hash: None });
    }
    let tx_hash = {
        let pending = client
            .send_transaction(tx, None)
            .await
            .map_err(|err| DeployError::Submission {
                reason: err.to_string(),
            })?;
        *pending
    };
    info!(artifact, network, ?tx_hash, state = %DeploymentState::Submitted, "deployment submitted");

    let receipt =
        wait_for_receipt(client.as_ref(), tx_hash, factory.network().poll_interval(), cancel)
            .await?;
    let address = match receipt.contract_address {
        Some(address) if receipt.status != Some(U64::zero()) => address,
        _ => {
            warn!(
                artifact,
                network,
                ?tx_hash,
                block_number = ?receipt.block_number,
                state = %DeploymentState::Failed,
                "deployment reverted"
            );
            return Err(DeployError::DeploymentReverted {
                tx_hash,
                block_number: receipt.block_number,
            });
        }
    };
    info!(
        artifact,
        network,
        ?address,
        block_number = ?receipt.block_number,
        state = %DeploymentState::Confirmed,
        "deployment confirmed"
    );

    let contract = Contract::new(address, factory.artifact().abi().clone(), client);
    Ok(DeployedContract::new(
        address,
        artifact.to_string(),
        network.to_string(),
        tx_hash,
        receipt.block_number,
        contract,
    ))
}

/// Polls for the receipt of a transaction until it is available. Provider
/// errors are logged and retried on the next poll.
async fn wait_for_receipt<M: Middleware>(
    client: &M,
    tx_hash: TxHash,
    interval: Duration,
    cancel: &CancellationToken,
) -> Result<TransactionReceipt, DeployError> {
    let cancelled = || {
        warn!(?tx_hash, state = %DeploymentState::Failed, "cancelled while waiting for deployment");
        DeployError::Cancelled {
            tx_hash: Some(tx_hash),
        }
    };
    loop {
        let receipt = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            receipt = client.get_transaction_receipt(tx_hash) => receipt,
        };
        match receipt {
            Ok(Some(receipt)) => return Ok(receipt),
            Ok(None) => debug!(?tx_hash, "deployment not yet included"),
            Err(err) => warn!(?tx_hash, %err, "failed to get deployment receipt"),
        }
        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(cancelled()),
            _ = sleep(interval) => {}
        }
    }
}
