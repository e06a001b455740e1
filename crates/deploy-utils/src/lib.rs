//! Deploys compiled contracts to a named network and checks that they respond.
//!
//! A run resolves the network, loads the artifact and the signer, submits the
//! deployment, waits for it to be included and then calls a read-only method
//! on the new contract.
pub mod chain;
pub mod error;
pub mod executor;
pub mod factory;
pub mod pipeline;
pub mod verifier;

#[cfg(test)]
mod testing;

pub use chain::{Chain, ChainClient};
pub use error::{DeployError, Stage};
pub use executor::{deploy, DeployedContract, DeploymentState};
pub use factory::{ContractFactory, TxOverrides};
pub use pipeline::{run, run_with_client, DeploymentReport, DeploymentRequest};
pub use verifier::{verify, VerificationResult};
