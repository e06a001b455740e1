use std::fmt;

use contract_artifacts::ArtifactError;
use ethers::types::{TxHash, U64};
use network_profiles::ConfigError;
use thiserror::Error;

/// The pipeline stage that an error was raised in.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Stage {
    Configuration,
    Factory,
    Submission,
    Confirmation,
    Verification,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let stage = match self {
            Stage::Configuration => "configuration",
            Stage::Factory => "factory",
            Stage::Submission => "submission",
            Stage::Confirmation => "confirmation",
            Stage::Verification => "verification",
        };
        write!(f, "{stage}")
    }
}

#[derive(Debug, Error)]
pub enum DeployError {
    #[error("configuration: {0}")]
    Configuration(#[from] ConfigError),
    #[error("factory: no compiled artifact named `{name}` (available: {available})")]
    ArtifactNotFound { name: String, available: String },
    #[error("factory: {0}")]
    Artifact(#[from] ArtifactError),
    #[error("factory: invalid constructor arguments for `{artifact}`: {reason}")]
    Argument { artifact: String, reason: String },
    #[error("submission: deployment transaction was rejected: {reason}")]
    Submission { reason: String },
    #[error("confirmation: deployment transaction {tx_hash:?} reverted in block {}", display_block(.block_number))]
    DeploymentReverted {
        tx_hash: TxHash,
        block_number: Option<U64>,
    },
    #[error("confirmation: cancelled while waiting for {}", display_tx(.tx_hash))]
    Cancelled { tx_hash: Option<TxHash> },
    #[error("verification: call to `{method}` failed: {reason}")]
    Call { method: String, reason: String },
    #[error("verification: network unavailable while calling `{method}`: {reason}")]
    NetworkUnavailable { method: String, reason: String },
}

fn display_block(block_number: &Option<U64>) -> String {
    block_number
        .map(|block_number| block_number.to_string())
        .unwrap_or_else(|| "unknown".to_string())
}

fn display_tx(tx_hash: &Option<TxHash>) -> String {
    tx_hash
        .map(|tx_hash| format!("transaction {tx_hash:?}"))
        .unwrap_or_else(|| "submission".to_string())
}

impl DeployError {
    pub fn stage(&self) -> Stage {
        match self {
            DeployError::Configuration(_) => Stage::Configuration,
            DeployError::ArtifactNotFound { .. }
            | DeployError::Artifact(_)
            | DeployError::Argument { .. } => Stage::Factory,
            DeployError::Submission { .. } => Stage::Submission,
            DeployError::DeploymentReverted { .. } | DeployError::Cancelled { .. } => {
                Stage::Confirmation
            }
            DeployError::Call { .. } | DeployError::NetworkUnavailable { .. } => {
                Stage::Verification
            }
        }
    }
}
