//! # Deployment Configuration
//!
//! Loaded from a TOML file, then overridden from the environment, then from
//! the command line. A missing file is not an error: defaults target a local
//! node on `http://127.0.0.1:8545`.
//!
//! ```toml
//! network_name = "telosTestnet"
//! deployer = "0x..."            # optional, defaults to the first eth_accounts entry
//!
//! [networks.telosTestnet]
//! rpc_url = "https://testnet.telos.net/evm"
//! chain_id = 41
//!
//! [paths]
//! address_book = "contracts/addresses.toml"
//! artifacts_dir = "artifacts/contracts"
//! logs_dir = "scripts/logs"
//! addresses_dir = "scripts"
//!
//! [inclusion]
//! timeout_secs = 300
//! poll_interval_ms = 1000
//! ```
//!
//! | Variable           | Overrides                    |
//! |--------------------|------------------------------|
//! | `NETWORK_NAME`     | `network_name`               |
//! | `SPEEDH_RPC_URL`   | RPC URL of the active network|
//! | `SPEEDH_CHAIN_ID`  | expected chain id            |
//! | `SPEEDH_DEPLOYER`  | `deployer`                   |

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use alloy_primitives::Address;
use serde::Deserialize;
use speedh_blockchain::InclusionPolicy;
use tracing::warn;

use crate::error::{DeployError, DeployResult};

/// RPC endpoint and chain of one named network.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct NetworkProfile {
    /// JSON-RPC endpoint.
    pub rpc_url: String,
    /// Chain id the endpoint must report, if pinned.
    #[serde(default)]
    pub chain_id: Option<u64>,
}

/// Filesystem locations.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct PathsConfig {
    /// Persisted address book.
    #[serde(default = "default_address_book")]
    pub address_book: PathBuf,
    /// Compiled contract artifacts (`<Name>.sol/<Name>.json`).
    #[serde(default = "default_artifacts_dir")]
    pub artifacts_dir: PathBuf,
    /// Deployment transcripts.
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,
    /// Per-network address dumps.
    #[serde(default = "default_addresses_dir")]
    pub addresses_dir: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            address_book: default_address_book(),
            artifacts_dir: default_artifacts_dir(),
            logs_dir: default_logs_dir(),
            addresses_dir: default_addresses_dir(),
        }
    }
}

/// Inclusion wait policy.
#[derive(Debug, Clone, Copy, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct InclusionConfig {
    /// Give up waiting for a receipt after this many seconds.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Delay between receipt polls.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

impl Default for InclusionConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
            poll_interval_ms: default_poll_interval_ms(),
        }
    }
}

/// Full deployment configuration.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct DeployConfig {
    /// Active network name. Selects a `[networks.<name>]` profile and names
    /// the address dump and transcript.
    #[serde(default = "default_network")]
    pub network_name: String,
    /// RPC URL used when the active network has no profile.
    #[serde(default = "default_rpc_url")]
    pub rpc_url: String,
    /// Expected chain id when the active network has no profile.
    #[serde(default)]
    pub chain_id: Option<u64>,
    /// Deployer account; defaults to the first account the endpoint exposes.
    #[serde(default)]
    pub deployer: Option<String>,
    /// Named network profiles.
    #[serde(default)]
    pub networks: BTreeMap<String, NetworkProfile>,
    /// Filesystem locations.
    #[serde(default)]
    pub paths: PathsConfig,
    /// Inclusion wait policy.
    #[serde(default)]
    pub inclusion: InclusionConfig,
    #[serde(skip)]
    rpc_override: Option<String>,
    #[serde(skip)]
    chain_override: Option<u64>,
}

fn default_network() -> String {
    "localhost".to_string()
}

fn default_rpc_url() -> String {
    "http://127.0.0.1:8545".to_string()
}

fn default_address_book() -> PathBuf {
    PathBuf::from("contracts/addresses.toml")
}

fn default_artifacts_dir() -> PathBuf {
    PathBuf::from("artifacts/contracts")
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("scripts/logs")
}

fn default_addresses_dir() -> PathBuf {
    PathBuf::from("scripts")
}

const fn default_timeout_secs() -> u64 {
    300
}

const fn default_poll_interval_ms() -> u64 {
    1000
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            network_name: default_network(),
            rpc_url: default_rpc_url(),
            chain_id: None,
            deployer: None,
            networks: BTreeMap::new(),
            paths: PathsConfig::default(),
            inclusion: InclusionConfig::default(),
            rpc_override: None,
            chain_override: None,
        }
    }
}

impl DeployConfig {
    /// Parses TOML text. `origin` is only used in error messages.
    ///
    /// # Errors
    ///
    /// [`DeployError::Config`] on invalid TOML or unknown keys.
    pub fn from_toml_str(text: &str, origin: &Path) -> DeployResult<Self> {
        toml::from_str(text).map_err(|e| DeployError::Config {
            path: origin.to_path_buf(),
            reason: e.to_string(),
        })
    }

    /// Loads `path`, falling back to defaults when it does not exist.
    ///
    /// # Errors
    ///
    /// I/O errors other than "not found", and parse errors.
    pub fn load(path: &Path) -> DeployResult<Self> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::from_toml_str(&text, path),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(path = %path.display(), "config file not found, using defaults");
                Ok(Self::default())
            }
            Err(e) => Err(DeployError::io(path, e)),
        }
    }

    /// Applies `SPEEDH_*` overrides from the process environment.
    ///
    /// # Errors
    ///
    /// See [`Self::apply_overrides`].
    pub fn apply_env(&mut self) -> DeployResult<()> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Applies `SPEEDH_*` overrides from `lookup`. Empty values are ignored.
    ///
    /// # Errors
    ///
    /// [`DeployError::Config`] if `SPEEDH_CHAIN_ID` is not an integer.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> DeployResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(network) = get("NETWORK_NAME") {
            self.network_name = network;
        }
        if let Some(url) = get("SPEEDH_RPC_URL") {
            self.rpc_override = Some(url);
        }
        if let Some(raw) = get("SPEEDH_CHAIN_ID") {
            let chain_id = raw.trim().parse().map_err(|_| DeployError::Config {
                path: PathBuf::from("SPEEDH_CHAIN_ID"),
                reason: format!("{raw:?} is not a chain id"),
            })?;
            self.chain_override = Some(chain_id);
        }
        if let Some(deployer) = get("SPEEDH_DEPLOYER") {
            self.deployer = Some(deployer);
        }
        Ok(())
    }

    /// Overrides the RPC URL, as `--rpc-url` does.
    pub fn set_rpc_url(&mut self, url: impl Into<String>) {
        self.rpc_override = Some(url.into());
    }

    /// RPC URL of the active network.
    #[must_use]
    pub fn rpc_url(&self) -> &str {
        self.rpc_override
            .as_deref()
            .or_else(|| self.networks.get(&self.network_name).map(|p| p.rpc_url.as_str()))
            .unwrap_or(&self.rpc_url)
    }

    /// Chain id the endpoint must report, if pinned.
    #[must_use]
    pub fn expected_chain_id(&self) -> Option<u64> {
        self.chain_override.or_else(|| {
            self.networks
                .get(&self.network_name)
                .map_or(self.chain_id, |p| p.chain_id)
        })
    }

    /// Parsed deployer address, if configured.
    ///
    /// # Errors
    ///
    /// [`DeployError::Config`] if the value is not an address.
    pub fn deployer_address(&self) -> DeployResult<Option<Address>> {
        self.deployer
            .as_deref()
            .map(|raw| {
                Address::from_str(raw.trim()).map_err(|e| DeployError::Config {
                    path: PathBuf::from("deployer"),
                    reason: format!("{raw:?} is not an address: {e}"),
                })
            })
            .transpose()
    }

    /// Inclusion wait policy.
    #[must_use]
    pub const fn inclusion_policy(&self) -> InclusionPolicy {
        InclusionPolicy {
            timeout: Duration::from_secs(self.inclusion.timeout_secs),
            poll_interval: Duration::from_millis(self.inclusion.poll_interval_ms),
        }
    }

    /// Where the address dump for the active network goes.
    #[must_use]
    pub fn dump_path(&self) -> PathBuf {
        self.paths
            .addresses_dir
            .join(format!("addresses.{}.json", self.network_name))
    }

    /// Copy whose outputs land under `<logs_dir>/simulation`, leaving the real
    /// address book and dumps untouched.
    #[must_use]
    pub fn for_simulation(&self) -> Self {
        let sandbox = self.paths.logs_dir.join("simulation");
        let mut config = self.clone();
        config.network_name = format!("{}-simulated", self.network_name);
        config.paths.address_book = sandbox.join("addresses.toml");
        config.paths.addresses_dir = sandbox.clone();
        config.paths.logs_dir = sandbox;
        config.inclusion.poll_interval_ms = config.inclusion.poll_interval_ms.min(10);
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    const SAMPLE: &str = r#"
network_name = "telosTestnet"

[networks.telosTestnet]
rpc_url = "https://testnet.telos.net/evm"
chain_id = 41

[networks.telosMainnet]
rpc_url = "https://mainnet.telos.net/evm"
chain_id = 40

[paths]
logs_dir = "out/logs"
"#;

    fn sample() -> DeployConfig {
        DeployConfig::from_toml_str(SAMPLE, Path::new("speedh.toml")).unwrap()
    }

    #[test]
    fn test_network_profile_selection() {
        let config = sample();
        assert_eq!(config.rpc_url(), "https://testnet.telos.net/evm");
        assert_eq!(config.expected_chain_id(), Some(41));
        assert_eq!(config.paths.logs_dir, PathBuf::from("out/logs"));
        assert_eq!(config.paths.address_book, default_address_book());
    }

    #[test]
    fn test_defaults_without_profile() {
        let config = DeployConfig::default();
        assert_eq!(config.rpc_url(), "http://127.0.0.1:8545");
        assert_eq!(config.expected_chain_id(), None);
        assert_eq!(config.inclusion_policy(), InclusionPolicy::default());
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("NETWORK_NAME", "telosMainnet"),
            ("SPEEDH_DEPLOYER", "0x00000000000000000000000000000000000000aa"),
            ("SPEEDH_RPC_URL", ""),
        ]
        .into_iter()
        .collect();
        let mut config = sample();
        config
            .apply_overrides(|k| env.get(k).map(|v| (*v).to_string()))
            .unwrap();

        assert_eq!(config.network_name, "telosMainnet");
        assert_eq!(config.rpc_url(), "https://mainnet.telos.net/evm");
        assert_eq!(config.expected_chain_id(), Some(40));
        assert_eq!(
            config.deployer_address().unwrap(),
            Some(Address::with_last_byte(0xaa))
        );
    }

    #[test]
    fn test_rpc_override_wins() {
        let mut config = sample();
        config
            .apply_overrides(|k| (k == "SPEEDH_RPC_URL").then(|| "http://node:8545".to_string()))
            .unwrap();
        assert_eq!(config.rpc_url(), "http://node:8545");
    }

    #[test]
    fn test_bad_chain_id_override() {
        let mut config = sample();
        let result = config.apply_overrides(|k| (k == "SPEEDH_CHAIN_ID").then(|| "forty".into()));
        assert!(matches!(result, Err(DeployError::Config { .. })));
    }

    #[test]
    fn test_unknown_key_rejected() {
        let result = DeployConfig::from_toml_str("netwrok_name = \"x\"", Path::new("bad.toml"));
        assert!(matches!(result, Err(DeployError::Config { .. })));
    }

    #[test]
    fn test_dump_path_uses_network() {
        assert_eq!(
            sample().dump_path(),
            PathBuf::from("scripts/addresses.telosTestnet.json")
        );
    }

    #[test]
    fn test_missing_file_uses_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = DeployConfig::load(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config, DeployConfig::default());
    }

    #[test]
    fn test_simulation_sandbox() {
        let config = sample().for_simulation();
        assert!(config.paths.address_book.starts_with("out/logs/simulation"));
        assert!(config.dump_path().starts_with("out/logs/simulation"));
        assert_eq!(config.network_name, "telosTestnet-simulated");
    }
}
