//! Fixtures shared by the unit tests.
use std::sync::Arc;

use contract_artifacts::{Artifact, ArtifactRegistry};
use ethers::{
    abi::{encode, Abi, Token},
    providers::{MockProvider, Provider},
    types::{Address, Bytes, TransactionReceipt, TxHash, U256, U64},
};
use network_profiles::{resolve, Environment, NetworkProfile, LOCALHOST};

use crate::factory::{ContractFactory, TxOverrides};

pub const GREETER_ABI: &str = r#"[
    {
        "inputs": [],
        "name": "hello",
        "outputs": [{ "internalType": "string", "name": "", "type": "string" }],
        "stateMutability": "pure",
        "type": "function"
    },
    {
        "inputs": [{ "internalType": "string", "name": "name", "type": "string" }],
        "name": "greet",
        "outputs": [{ "internalType": "string", "name": "", "type": "string" }],
        "stateMutability": "pure",
        "type": "function"
    }
]"#;

/// Creation code for a contract that returns the ABI encoding of "hello" for
/// every call.
pub const GREETER_BYTECODE: &str =
    "0x601b80600b6000396000f3602060005260056020526468656c6c6f60d81b60405260606000f3";

pub const STAKING_ABI: &str = r#"[
    {
        "inputs": [
            { "internalType": "uint256", "name": "rewardRate", "type": "uint256" },
            { "internalType": "address", "name": "owner", "type": "address" }
        ],
        "stateMutability": "nonpayable",
        "type": "constructor"
    },
    {
        "inputs": [],
        "name": "hello",
        "outputs": [{ "internalType": "string", "name": "", "type": "string" }],
        "stateMutability": "view",
        "type": "function"
    }
]"#;

pub fn greeter() -> Artifact {
    Artifact::new(
        "Greeter",
        serde_json::from_str::<Abi>(GREETER_ABI).unwrap(),
        GREETER_BYTECODE.parse().unwrap(),
    )
}

pub fn staking() -> Artifact {
    Artifact::new(
        "StakingRewards",
        serde_json::from_str::<Abi>(STAKING_ABI).unwrap(),
        GREETER_BYTECODE.parse().unwrap(),
    )
}

pub fn registry() -> ArtifactRegistry {
    let mut registry = ArtifactRegistry::default();
    registry.insert(greeter());
    registry.insert(staking());
    registry
}

/// The localhost profile with a short poll interval.
pub fn localhost() -> NetworkProfile {
    let environment = Environment {
        poll_interval_ms: Some(1),
        ..Default::default()
    };
    resolve(&environment).get(LOCALHOST).unwrap().clone()
}

pub fn greeter_factory() -> ContractFactory {
    ContractFactory::load(&registry(), "Greeter", &localhost()).unwrap()
}

/// Overrides that stop the provider from asking the node for gas values, so
/// the only request made during submission is the submission itself.
pub fn overrides() -> TxOverrides {
    TxOverrides {
        gas_limit: Some(U256::from(1_000_000)),
        gas_price: Some(U256::from(1_000_000_000)),
    }
}

pub fn mocked_client() -> (Arc<Provider<MockProvider>>, MockProvider) {
    let (provider, mock) = Provider::mocked();
    (Arc::new(provider), mock)
}

pub fn tx_hash() -> TxHash {
    TxHash::repeat_byte(0x11)
}

pub fn contract_address() -> Address {
    Address::repeat_byte(0x22)
}

pub fn receipt(status: u64) -> TransactionReceipt {
    TransactionReceipt {
        transaction_hash: tx_hash(),
        block_number: Some(U64::from(7)),
        contract_address: Some(contract_address()),
        status: Some(U64::from(status)),
        ..Default::default()
    }
}

/// The receipt of a transaction that hasn't been included yet.
pub fn pending() -> Option<TransactionReceipt> {
    None
}

pub fn encoded_string(value: &str) -> Bytes {
    encode(&[Token::String(value.to_string())]).into()
}
