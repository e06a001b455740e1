use std::fmt;

use chrono::{DateTime, Utc};
use ethers::{
    abi::Token,
    contract::ContractError,
    providers::{Middleware, MiddlewareError},
};
use tracing::info;

use crate::{error::DeployError, executor::DeployedContract};

/// The value a deployed contract returned from a read-only call.
#[derive(Clone, Debug, PartialEq)]
pub struct VerificationResult {
    pub method_name: String,
    pub returned_value: Token,
    pub observed_at: DateTime<Utc>,
}

impl fmt::Display for VerificationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.method_name, self.returned_value)
    }
}

/// Calls a no-argument method on a deployed contract with `eth_call`. This
/// never sends a transaction.
pub async fn verify<M: Middleware + 'static>(
    deployed: &DeployedContract<M>,
    method_name: &str,
) -> Result<VerificationResult, DeployError> {
    let call_error = |reason: String| DeployError::Call {
        method: method_name.to_string(),
        reason,
    };

    // Check the interface before calling so that a typo never reaches the
    // node.
    let function = deployed.contract().abi().function(method_name).map_err(|_| {
        call_error(format!(
            "`{}` has no method named `{method_name}`",
            deployed.artifact_name()
        ))
    })?;
    if !function.inputs.is_empty() {
        return Err(call_error(format!(
            "expected a method without arguments, but it takes {}",
            function.inputs.len()
        )));
    }

    let returned_value = deployed
        .contract()
        .method::<_, Token>(method_name, ())
        .map_err(|err| call_error(err.to_string()))?
        .call()
        .await
        .map_err(|err| classify_call_error(method_name, err))?;

    let result = VerificationResult {
        method_name: method_name.to_string(),
        returned_value,
        observed_at: Utc::now(),
    };
    info!(
        network = deployed.network(),
        address = ?deployed.address(),
        method = method_name,
        value = %result.returned_value,
        "verified deployment"
    );

    Ok(result)
}

/// JSON-RPC error responses mean that the node executed the call and it
/// failed. Anything else means that the node couldn't be reached.
fn classify_call_error<M: Middleware>(method: &str, err: ContractError<M>) -> DeployError {
    let unreachable = match &err {
        ContractError::MiddlewareError { e } => e.as_error_response().is_none(),
        ContractError::ProviderError { e } => e.as_error_response().is_none(),
        _ => false,
    };
    if unreachable {
        DeployError::NetworkUnavailable {
            method: method.to_string(),
            reason: err.to_string(),
        }
    } else {
        DeployError::Call {
            method: method.to_string(),
            reason: err.to_string(),
        }
    }
}
