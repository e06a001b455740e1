use std::{env, fs, path::Path};

use ethers::utils::{Anvil, AnvilInstance};
use eyre::Result;
use serde_json::{json, Value};

lazy_static! {
    // The dev node the tests should deploy to. If None, then the tests will
    // spawn an anvil node.
    pub static ref MAYBE_ETHEREUM_URL: Option<String> = env::var("DEPLOY_ETHEREUM_URL").ok();
}

/// Creation code for a contract that returns the ABI encoding of "hello" for
/// every call. Anything appended to it (like constructor arguments) is
/// ignored.
pub const GREETER_BYTECODE: &str =
    "0x601b80600b6000396000f3602060005260056020526468656c6c6f60d81b60405260606000f3";

/// The first account derived from the dev mnemonic that anvil and hardhat use
/// by default.
pub const DEV_ADDRESS: &str = "0xf39Fd6e51aad88F6F4ce6aB8827279cffFb92266";

/// The second account derived from the dev mnemonic.
pub const SECOND_DEV_KEY: &str =
    "0x59c6995e998f97a5a0044966f0945389dc9e86dae88c7a8412f4603b6b78690d";
pub const SECOND_DEV_ADDRESS: &str = "0x70997970C51812dc3A010C7d01b50e0d17dc79C8";

fn hello() -> Value {
    json!({
        "inputs": [],
        "name": "hello",
        "outputs": [{ "internalType": "string", "name": "", "type": "string" }],
        "stateMutability": "view",
        "type": "function"
    })
}

fn write_artifact(out: &Path, source: &str, name: &str, artifact: Value) -> Result<()> {
    let dir = out.join(source);
    fs::create_dir_all(&dir)?;
    fs::write(
        dir.join(format!("{name}.json")),
        serde_json::to_string_pretty(&artifact)?,
    )?;
    Ok(())
}

/// Writes a Foundry build output with a `Greeter` and a `StakingRewards`
/// contract, plus an interface that can't be deployed.
pub fn write_artifacts(out: &Path) -> Result<()> {
    write_artifact(
        out,
        "Greeter.sol",
        "Greeter",
        json!({
            "abi": [hello()],
            "bytecode": { "object": GREETER_BYTECODE },
        }),
    )?;
    write_artifact(
        out,
        "StakingRewards.sol",
        "StakingRewards",
        json!({
            "abi": [
                {
                    "inputs": [
                        { "internalType": "uint256", "name": "rewardRate", "type": "uint256" },
                        { "internalType": "address", "name": "owner", "type": "address" }
                    ],
                    "stateMutability": "nonpayable",
                    "type": "constructor"
                },
                hello()
            ],
            "bytecode": { "object": GREETER_BYTECODE },
        }),
    )?;
    write_artifact(
        out,
        "IGreeter.sol",
        "IGreeter",
        json!({
            "abi": [hello()],
            "bytecode": { "object": "0x" },
        }),
    )?;
    Ok(())
}

/// The endpoint of a dev node. The anvil instance has to be kept alive for as
/// long as the endpoint is used.
pub fn dev_node() -> (String, Option<AnvilInstance>) {
    // If an ethereum url is provided, use it. Otherwise, we spawn an anvil
    // node.
    if let Some(ethereum_url) = &*MAYBE_ETHEREUM_URL {
        (ethereum_url.clone(), None)
    } else {
        let anvil = Anvil::new().spawn();
        (anvil.endpoint(), Some(anvil))
    }
}
