//! Resolves the named networks that contracts can be deployed to from a
//! snapshot of the environment.
//!
//! Resolution never fails. Missing endpoints and credentials are surfaced
//! the first time a profile is used for something that needs them.
use std::{collections::BTreeMap, fmt, time::Duration};

use serde::Deserialize;
use thiserror::Error;
use url::Url;

pub const LOCALHOST: &str = "localhost";
pub const SEPOLIA: &str = "sepolia";

/// The endpoint of a local dev node (anvil or hardhat).
pub const LOCALHOST_RPC_URL: &str = "http://127.0.0.1:8545";

pub const SEPOLIA_RPC_VAR: &str = "SEPOLIA_RPC";
pub const PRIVATE_KEY_VAR: &str = "PRIVATE_KEY";

const DEV_POLL_INTERVAL: Duration = Duration::from_millis(100);
const REMOTE_POLL_INTERVAL: Duration = Duration::from_millis(1_000);

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read the environment: {0}")]
    Environment(#[from] envy::Error),
    #[error("unknown network `{name}` (known networks: {known})")]
    UnknownNetwork { name: String, known: String },
    #[error("network `{network}` has no RPC endpoint configured{}", hint(.variable))]
    MissingEndpoint {
        network: String,
        variable: Option<&'static str>,
    },
    #[error("network `{network}` has an invalid RPC endpoint `{endpoint}`: {source}")]
    InvalidEndpoint {
        network: String,
        endpoint: String,
        source: url::ParseError,
    },
    #[error("network `{network}` has no signing credentials configured{}", hint(.variable))]
    MissingCredentials {
        network: String,
        variable: Option<&'static str>,
    },
    #[error("network `{network}` has invalid signing credentials: {reason}")]
    InvalidCredentials { network: String, reason: String },
}

fn hint(variable: &Option<&'static str>) -> String {
    variable
        .map(|variable| format!(" (set {variable})"))
        .unwrap_or_default()
}

/// The environment variables that feed the network table. This is read once
/// at startup and passed around explicitly.
#[derive(Clone, Debug, Default, Deserialize, PartialEq, Eq)]
pub struct Environment {
    pub sepolia_rpc: Option<String>,
    pub private_key: Option<String>,
    #[serde(rename = "deploy_poll_interval_ms")]
    pub poll_interval_ms: Option<u64>,
}

impl Environment {
    /// Reads the environment of the current process.
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(envy::from_env()?)
    }

    /// Reads the environment from a set of key-value pairs. Keys are matched
    /// case-insensitively, so `SEPOLIA_RPC` and `sepolia_rpc` are equivalent.
    pub fn from_vars<I, K, V>(vars: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Ok(envy::from_iter(
            vars.into_iter().map(|(k, v)| (k.into(), v.into())),
        )?)
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Transport {
    #[default]
    Http,
}

impl fmt::Display for Transport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Transport::Http => write!(f, "http"),
        }
    }
}

/// Everything needed to reach a single network.
#[derive(Clone, PartialEq, Eq)]
pub struct NetworkProfile {
    pub name: String,
    pub rpc_endpoint: Option<String>,
    pub signing_credentials: Vec<String>,
    pub transport: Transport,
    dev_network: bool,
    poll_interval: Duration,
    endpoint_var: Option<&'static str>,
    credentials_var: Option<&'static str>,
}

// Credentials are secrets, so they are never printed.
impl fmt::Debug for NetworkProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkProfile")
            .field("name", &self.name)
            .field("rpc_endpoint", &self.rpc_endpoint)
            .field(
                "signing_credentials",
                &format_args!("[{} redacted]", self.signing_credentials.len()),
            )
            .field("transport", &self.transport)
            .field("dev_network", &self.dev_network)
            .field("poll_interval", &self.poll_interval)
            .finish()
    }
}

impl NetworkProfile {
    /// Creates a profile for a remote network.
    pub fn new(
        name: impl Into<String>,
        rpc_endpoint: Option<String>,
        signing_credentials: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            rpc_endpoint,
            signing_credentials,
            transport: Transport::Http,
            dev_network: false,
            poll_interval: REMOTE_POLL_INTERVAL,
            endpoint_var: None,
            credentials_var: None,
        }
    }

    /// Marks the profile as a local dev node with unlocked, pre-funded
    /// accounts. Deployments on a dev network without credentials are signed
    /// with the dev node's default account.
    pub fn dev_network(mut self) -> Self {
        self.dev_network = true;
        self.poll_interval = DEV_POLL_INTERVAL;
        self
    }

    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn with_vars(mut self, endpoint_var: &'static str, credentials_var: &'static str) -> Self {
        self.endpoint_var = Some(endpoint_var);
        self.credentials_var = Some(credentials_var);
        self
    }

    pub fn is_dev_network(&self) -> bool {
        self.dev_network
    }

    /// How often to poll the node while waiting on a transaction.
    pub fn poll_interval(&self) -> Duration {
        self.poll_interval
    }

    /// The RPC endpoint as a URL. Fails if the endpoint is unset, empty, or
    /// not a valid URL.
    pub fn rpc_url(&self) -> Result<Url, ConfigError> {
        let endpoint = self
            .rpc_endpoint
            .as_deref()
            .filter(|endpoint| !endpoint.is_empty())
            .ok_or_else(|| ConfigError::MissingEndpoint {
                network: self.name.clone(),
                variable: self.endpoint_var,
            })?;
        Url::parse(endpoint).map_err(|source| ConfigError::InvalidEndpoint {
            network: self.name.clone(),
            endpoint: endpoint.to_string(),
            source,
        })
    }

    /// The key that signs transactions on this network. `None` means that
    /// the network is a dev network and the dev node's default account
    /// should be used.
    pub fn signing_key(&self) -> Result<Option<&str>, ConfigError> {
        match self.signing_credentials.first() {
            Some(key) => Ok(Some(key.as_str())),
            None if self.dev_network => Ok(None),
            None => Err(ConfigError::MissingCredentials {
                network: self.name.clone(),
                variable: self.credentials_var,
            }),
        }
    }
}

/// The named networks that can be targeted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct NetworkTable {
    profiles: BTreeMap<String, NetworkProfile>,
}

impl NetworkTable {
    pub fn insert(&mut self, profile: NetworkProfile) -> Option<NetworkProfile> {
        self.profiles.insert(profile.name.clone(), profile)
    }

    pub fn get(&self, name: &str) -> Result<&NetworkProfile, ConfigError> {
        self.profiles
            .get(name)
            .ok_or_else(|| ConfigError::UnknownNetwork {
                name: name.to_string(),
                known: self.names().collect::<Vec<_>>().join(", "),
            })
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.profiles.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &NetworkProfile> {
        self.profiles.values()
    }

    pub fn len(&self) -> usize {
        self.profiles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.profiles.is_empty()
    }
}

/// Builds the network table from an environment snapshot.
pub fn resolve(environment: &Environment) -> NetworkTable {
    let poll_override = environment.poll_interval_ms.map(Duration::from_millis);

    let localhost =
        NetworkProfile::new(LOCALHOST, Some(LOCALHOST_RPC_URL.to_string()), vec![]).dev_network();

    // An empty private key is treated the same as a missing one.
    let sepolia_credentials = environment
        .private_key
        .iter()
        .filter(|key| !key.is_empty())
        .cloned()
        .collect();
    let sepolia = NetworkProfile::new(
        SEPOLIA,
        environment.sepolia_rpc.clone(),
        sepolia_credentials,
    )
    .with_vars(SEPOLIA_RPC_VAR, PRIVATE_KEY_VAR);

    let mut table = NetworkTable::default();
    for profile in [localhost, sepolia] {
        let profile = match poll_override {
            Some(interval) => profile.with_poll_interval(interval),
            None => profile,
        };
        table.insert(profile);
    }
    table
}
