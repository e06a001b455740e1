/// This module turns a compiled artifact into deployment transactions that are
/// bound to the signer of the target network, or to the node's own accounts
/// on a dev network without credentials.
use contract_artifacts::{Artifact, ArtifactRegistry};
use ethers::{
    abi::{
        token::{LenientTokenizer, Tokenizer},
        Token,
    },
    signers::{LocalWallet, Signer},
    types::{
        transaction::eip2718::TypedTransaction, Address, Bytes, Eip1559TransactionRequest,
        TransactionRequest, U256,
    },
};
use network_profiles::{ConfigError, NetworkProfile};
use tracing::debug;

use crate::error::DeployError;

/// Caller-provided values that the node would otherwise fill in.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TxOverrides {
    pub gas_limit: Option<U256>,
    /// Setting a gas price sends a legacy transaction.
    pub gas_price: Option<U256>,
}

/// Parses textual constructor arguments against an artifact's constructor.
/// Numbers may be decimal or hex and addresses may omit the checksum.
pub fn parse_constructor_args(
    artifact: &Artifact,
    values: &[String],
) -> Result<Vec<Token>, DeployError> {
    let argument_error = |reason: String| DeployError::Argument {
        artifact: artifact.name().to_string(),
        reason,
    };
    let params = artifact
        .constructor()
        .map(|constructor| constructor.inputs.as_slice())
        .unwrap_or_default();
    if params.len() != values.len() {
        return Err(argument_error(format!(
            "expected {} arguments, got {}",
            params.len(),
            values.len()
        )));
    }
    params
        .iter()
        .zip(values)
        .map(|(param, value)| {
            LenientTokenizer::tokenize(&param.kind, value).map_err(|err| {
                argument_error(format!(
                    "`{}` is not a valid {} for `{}`: {err}",
                    value, param.kind, param.name
                ))
            })
        })
        .collect()
}

/// Looks up an artifact by name.
pub fn find_artifact<'a>(
    registry: &'a ArtifactRegistry,
    name: &str,
) -> Result<&'a Artifact, DeployError> {
    registry.get(name).ok_or_else(|| DeployError::ArtifactNotFound {
        name: name.to_string(),
        available: registry.names().collect::<Vec<_>>().join(", "),
    })
}

/// Produces deployment transactions for one artifact on one network.
#[derive(Clone, Debug)]
pub struct ContractFactory {
    artifact: Artifact,
    network: NetworkProfile,
    /// `None` means that the node signs with one of its unlocked accounts.
    signer: Option<LocalWallet>,
}

impl ContractFactory {
    /// Looks up the artifact and binds it to the network's signer. The
    /// network's first signing credential is used when there is one. Dev
    /// networks without credentials are left unsigned so that the node signs
    /// with its own account. This never talks to the network.
    pub fn load(
        registry: &ArtifactRegistry,
        artifact_name: &str,
        network: &NetworkProfile,
    ) -> Result<Self, DeployError> {
        let artifact = find_artifact(registry, artifact_name)?.clone();

        let signer = network
            .signing_key()?
            .map(|key| {
                key.parse::<LocalWallet>()
                    .map_err(|err| ConfigError::InvalidCredentials {
                        network: network.name.clone(),
                        reason: err.to_string(),
                    })
            })
            .transpose()?;
        debug!(
            artifact = artifact_name,
            network = %network.name,
            signer = ?signer.as_ref().map(Signer::address),
            "loaded contract factory"
        );

        Ok(Self {
            artifact,
            network: network.clone(),
            signer,
        })
    }

    pub fn artifact(&self) -> &Artifact {
        &self.artifact
    }

    pub fn network(&self) -> &NetworkProfile {
        &self.network
    }

    pub fn signer(&self) -> Option<&LocalWallet> {
        self.signer.as_ref()
    }

    /// The address that deploys the contract, unless the node picks it.
    pub fn deployer(&self) -> Option<Address> {
        self.signer.as_ref().map(Signer::address)
    }

    pub fn parse_constructor_args(&self, values: &[String]) -> Result<Vec<Token>, DeployError> {
        parse_constructor_args(&self.artifact, values)
    }

    /// Builds the contract creation transaction. Arguments that don't match
    /// the constructor are rejected here, before anything is sent.
    pub fn deployment_tx(
        &self,
        args: &[Token],
        overrides: &TxOverrides,
    ) -> Result<TypedTransaction, DeployError> {
        let bytecode = self.artifact.bytecode().to_vec();
        let data: Bytes = match self.artifact.constructor() {
            Some(constructor) => constructor
                .encode_input(bytecode, args)
                .map_err(|err| DeployError::Submission {
                    reason: format!("malformed constructor arguments: {err}"),
                })?
                .into(),
            None if args.is_empty() => bytecode.into(),
            None => {
                return Err(DeployError::Submission {
                    reason: format!(
                        "`{}` has no constructor but {} arguments were given",
                        self.artifact.name(),
                        args.len()
                    ),
                })
            }
        };

        let mut tx: TypedTransaction = match overrides.gas_price {
            Some(gas_price) => TransactionRequest::new()
                .data(data)
                .gas_price(gas_price)
                .into(),
            None => Eip1559TransactionRequest::new().data(data).into(),
        };
        if let Some(from) = self.deployer() {
            tx.set_from(from);
        }
        if let Some(gas_limit) = overrides.gas_limit {
            tx.set_gas(gas_limit);
        }

        Ok(tx)
    }
}
