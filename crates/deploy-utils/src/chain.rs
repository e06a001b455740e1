use std::sync::Arc;

use ethers::{
    middleware::SignerMiddleware,
    providers::{Http, JsonRpcClient, Middleware, Provider},
    signers::{LocalWallet, Signer},
};
use network_profiles::NetworkProfile;
use tracing::debug;

use crate::error::DeployError;

/// A client that signs transactions locally before sending them to the node.
pub type ChainClient = SignerMiddleware<Provider<Http>, LocalWallet>;

/// The connection to the network that a profile points at. The connection
/// lives as long as the clients created from it.
#[derive(Clone, Debug)]
pub struct Chain {
    name: String,
    provider: Provider<Http>,
}

impl Chain {
    /// Builds a provider for the profile's endpoint. This doesn't talk to the
    /// node, so it only fails if the profile is misconfigured.
    pub fn connect(profile: &NetworkProfile) -> Result<Self, DeployError> {
        let url = profile.rpc_url()?;
        let provider = Provider::new(Http::new(url)).interval(profile.poll_interval());
        Ok(Self {
            name: profile.name.clone(),
            provider,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// A provider that can access the chain.
    pub fn provider(&self) -> Provider<Http> {
        self.provider.clone()
    }

    /// A client that signs with the given signer. The signer is bound to the
    /// node's chain id, so this is the first point where the node has to be
    /// reachable.
    pub async fn client(&self, signer: LocalWallet) -> Result<Arc<ChainClient>, DeployError> {
        let chain_id = self
            .provider
            .get_chainid()
            .await
            .map_err(|err| DeployError::Submission {
                reason: format!("couldn't reach network `{}`: {err}", self.name),
            })?
            .low_u64();
        debug!(network = %self.name, chain_id, signer = ?signer.address(), "connected");
        Ok(Arc::new(SignerMiddleware::new(
            self.provider(),
            signer.with_chain_id(chain_id),
        )))
    }

    /// A client that leaves signing to the node. Transactions are sent from
    /// the node's first unlocked account.
    pub async fn unlocked_client(&self) -> Result<Arc<Provider<Http>>, DeployError> {
        Ok(Arc::new(
            with_unlocked_sender(self.provider(), &self.name).await?,
        ))
    }
}

/// Makes the node's first unlocked account the sender of everything sent
/// through the provider.
pub async fn with_unlocked_sender<P: JsonRpcClient>(
    provider: Provider<P>,
    network: &str,
) -> Result<Provider<P>, DeployError> {
    let accounts = provider
        .get_accounts()
        .await
        .map_err(|err| DeployError::Submission {
            reason: format!("couldn't reach network `{network}`: {err}"),
        })?;
    let sender = accounts
        .first()
        .copied()
        .ok_or_else(|| DeployError::Submission {
            reason: format!("network `{network}` has no unlocked accounts to send from"),
        })?;
    debug!(network, ?sender, "using the node's unlocked account");
    Ok(provider.with_sender(sender))
}
