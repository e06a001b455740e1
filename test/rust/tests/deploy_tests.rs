use contract_artifacts::ArtifactRegistry;
use deploy_utils::{run, DeployError, DeploymentRequest, Stage, TxOverrides};
use ethers::{
    abi::Token,
    providers::{Http, Middleware, Provider},
    types::Address,
    utils::Anvil,
};
use eyre::Result;
use network_profiles::{resolve, ConfigError, Environment, NetworkProfile, SEPOLIA};
use tempfile::tempdir;
use tokio_util::sync::CancellationToken;

use crate::common::{
    dev_node, write_artifacts, DEV_ADDRESS, SECOND_DEV_ADDRESS, SECOND_DEV_KEY,
};

const CUSTOM_MNEMONIC: &str =
    "abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon abandon about";

#[test]
fn test_registry_from_build_output() -> Result<()> {
    let out = tempdir()?;
    write_artifacts(out.path())?;

    let registry = ArtifactRegistry::from_dir(out.path())?;
    assert_eq!(
        registry.names().collect::<Vec<_>>(),
        vec!["Greeter", "StakingRewards"]
    );

    Ok(())
}

#[tokio::test]
async fn test_deploy_without_private_key() -> Result<()> {
    let out = tempdir()?;
    write_artifacts(out.path())?;
    let registry = ArtifactRegistry::from_dir(out.path())?;

    let environment =
        Environment::from_vars([("SEPOLIA_RPC", "https://x"), ("PRIVATE_KEY", "")])?;
    let network = resolve(&environment).get(SEPOLIA)?.clone();
    assert_eq!(network.rpc_endpoint.as_deref(), Some("https://x"));
    assert!(network.signing_credentials.is_empty());

    let request =
        DeploymentRequest::parse(&registry, "Greeter", &[], network, TxOverrides::default())?;
    let err = run(&registry, &request, "hello", &CancellationToken::new())
        .await
        .unwrap_err();
    assert_eq!(err.stage(), Stage::Configuration);
    assert!(matches!(
        err,
        DeployError::Configuration(ConfigError::MissingCredentials { .. })
    ));

    Ok(())
}

// TODO: We should be able to run this in CI once foundry is installed there.
#[ignore]
#[tokio::test]
async fn test_deploy_to_dev_node() -> Result<()> {
    // Set up the logger.
    let _ = tracing_subscriber::fmt::try_init();

    let out = tempdir()?;
    write_artifacts(out.path())?;
    let registry = ArtifactRegistry::from_dir(out.path())?;
    let (endpoint, _maybe_anvil) = dev_node();
    let network = NetworkProfile::new("anvil", Some(endpoint.clone()), vec![]).dev_network();

    // Deploy from the node's unlocked account and say hello.
    let request =
        DeploymentRequest::parse(&registry, "Greeter", &[], network, TxOverrides::default())?;
    let report = run(&registry, &request, "hello", &CancellationToken::new()).await?;
    assert_eq!(report.network, "anvil");
    assert_ne!(report.address, Address::zero());
    assert!(report.block_number.is_some());
    assert_eq!(
        report.verification.returned_value,
        Token::String("hello".to_string())
    );

    // The contract code is on-chain and was deployed by the node's account.
    let provider = Provider::<Http>::try_from(endpoint)?;
    assert!(!provider.get_code(report.address, None).await?.is_empty());
    let tx = provider
        .get_transaction(report.tx_hash)
        .await?
        .ok_or_else(|| eyre::eyre!("missing deployment transaction"))?;
    assert_eq!(Some(&tx.from), provider.get_accounts().await?.first());

    Ok(())
}

#[ignore]
#[tokio::test]
async fn test_deploy_to_dev_node_with_custom_accounts() -> Result<()> {
    let out = tempdir()?;
    write_artifacts(out.path())?;
    let registry = ArtifactRegistry::from_dir(out.path())?;

    // None of this node's accounts come from the usual dev mnemonic.
    let anvil = Anvil::new().mnemonic(CUSTOM_MNEMONIC).spawn();
    let provider = Provider::<Http>::try_from(anvil.endpoint())?;
    let account = provider.get_accounts().await?[0];
    assert_ne!(account, DEV_ADDRESS.parse::<Address>()?);

    let network = NetworkProfile::new("anvil", Some(anvil.endpoint()), vec![]).dev_network();
    let request =
        DeploymentRequest::parse(&registry, "Greeter", &[], network, TxOverrides::default())?;
    let report = run(&registry, &request, "hello", &CancellationToken::new()).await?;

    let tx = provider
        .get_transaction(report.tx_hash)
        .await?
        .ok_or_else(|| eyre::eyre!("missing deployment transaction"))?;
    assert_eq!(tx.from, account);

    Ok(())
}

#[ignore]
#[tokio::test]
async fn test_deploy_with_constructor_arguments() -> Result<()> {
    let out = tempdir()?;
    write_artifacts(out.path())?;
    let registry = ArtifactRegistry::from_dir(out.path())?;
    let (endpoint, _maybe_anvil) = dev_node();
    let network = NetworkProfile::new(
        "anvil",
        Some(endpoint.clone()),
        vec![SECOND_DEV_KEY.to_string()],
    );

    let request = DeploymentRequest::parse(
        &registry,
        "StakingRewards",
        &["100".to_string(), SECOND_DEV_ADDRESS.to_string()],
        network,
        TxOverrides::default(),
    )?;
    let report = run(&registry, &request, "hello", &CancellationToken::new()).await?;
    assert_eq!(report.artifact_name, "StakingRewards");

    // The deployment was signed with the configured key.
    let provider = Provider::<Http>::try_from(endpoint)?;
    let tx = provider
        .get_transaction(report.tx_hash)
        .await?
        .ok_or_else(|| eyre::eyre!("missing deployment transaction"))?;
    assert_eq!(tx.from, SECOND_DEV_ADDRESS.parse::<Address>()?);

    Ok(())
}
