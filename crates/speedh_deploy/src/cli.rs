//! Command-line plumbing shared by the binaries.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Args;
use speedh_blockchain::{ChainBackend, JsonRpcBackend, SimulatedChain};
use tracing::info;

use crate::config::DeployConfig;
use crate::error::DeployResult;

/// Chain id used by `--simulate` when the configuration pins none.
pub const SIMULATED_CHAIN_ID: u64 = 31_337;

/// Flags every binary accepts.
#[derive(Debug, Clone, Args)]
pub struct CommonArgs {
    /// Configuration file (missing file means defaults)
    #[arg(short, long, default_value = "speedh.toml")]
    pub config: PathBuf,

    /// Network name, overrides `network_name` and NETWORK_NAME
    #[arg(short, long)]
    pub network: Option<String>,

    /// RPC endpoint, overrides the network profile and SPEEDH_RPC_URL
    #[arg(long)]
    pub rpc_url: Option<String>,

    /// Run against an in-memory chain; outputs go to <logs_dir>/simulation
    #[arg(long)]
    pub simulate: bool,

    /// Debug logging (RUST_LOG still wins)
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// File, then environment, then flags.
    ///
    /// # Errors
    ///
    /// Config file or override errors.
    pub fn load_config(&self) -> DeployResult<DeployConfig> {
        let mut config = DeployConfig::load(&self.config)?;
        config.apply_env()?;
        if let Some(network) = &self.network {
            config.network_name.clone_from(network);
        }
        if let Some(url) = &self.rpc_url {
            config.set_rpc_url(url.clone());
        }
        if self.simulate {
            config = config.for_simulation();
        }
        Ok(config)
    }
}

/// The chain a binary talks to.
pub enum Connection {
    /// A JSON-RPC node.
    Rpc(Arc<JsonRpcBackend>),
    /// The in-memory chain.
    Simulated(Arc<SimulatedChain>),
}

impl Connection {
    /// Connects according to `config`, or builds a simulated chain.
    ///
    /// # Errors
    ///
    /// [`crate::DeployError::Chain`] if the RPC URL is unusable.
    pub fn open(config: &DeployConfig, simulate: bool) -> DeployResult<Self> {
        if simulate {
            let chain_id = config.expected_chain_id().unwrap_or(SIMULATED_CHAIN_ID);
            info!(chain_id, "using simulated chain");
            return Ok(Self::Simulated(Arc::new(SimulatedChain::new(chain_id))));
        }
        info!(url = config.rpc_url(), "connecting");
        Ok(Self::Rpc(Arc::new(JsonRpcBackend::new(config.rpc_url())?)))
    }

    /// Type-erased backend.
    #[must_use]
    pub fn backend(&self) -> Arc<dyn ChainBackend> {
        match self {
            Self::Rpc(rpc) => Arc::clone(rpc) as Arc<dyn ChainBackend>,
            Self::Simulated(sim) => Arc::clone(sim) as Arc<dyn ChainBackend>,
        }
    }

    /// Whether this is the in-memory chain.
    #[must_use]
    pub const fn is_simulated(&self) -> bool {
        matches!(self, Self::Simulated(_))
    }
}

/// Prints the boxed two-line banner the binaries open with.
pub fn banner(title: &str, subtitle: &str) {
    const WIDTH: usize = 66;
    println!("╔{}╗", "═".repeat(WIDTH));
    println!("║         {title:<width$}║", width = WIDTH - 9);
    println!("║         {subtitle:<width$}║", width = WIDTH - 9);
    println!("╚{}╝", "═".repeat(WIDTH));
    println!();
}

/// Prints a `┌─ TITLE ─┐ ... └─┘` block of `key: value` rows.
pub fn panel(title: &str, rows: &[(&str, String)]) {
    println!("┌─ {title} {}┐", "─".repeat(62_usize.saturating_sub(title.chars().count())));
    for (key, value) in rows {
        println!("│ {:<20}{value}", format!("{key}:"));
    }
    println!("└{}┘", "─".repeat(66));
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser)]
    struct Cli {
        #[command(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn test_flag_defaults() {
        let cli = Cli::parse_from(["speedh_deploy"]);
        assert_eq!(cli.common.config, PathBuf::from("speedh.toml"));
        assert!(!cli.common.simulate);
        assert!(cli.common.network.is_none());
    }

    #[test]
    fn test_flags_override_config() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("speedh.toml");
        std::fs::write(&path, "network_name = \"telosTestnet\"\n").unwrap();

        let cli = Cli::parse_from([
            "speedh_deploy",
            "--config",
            path.to_str().unwrap(),
            "--network",
            "telosMainnet",
            "--rpc-url",
            "http://node:8545",
        ]);
        let config = cli.common.load_config().unwrap();
        assert_eq!(config.network_name, "telosMainnet");
        assert_eq!(config.rpc_url(), "http://node:8545");
    }

    #[test]
    fn test_simulated_connection() {
        let connection = Connection::open(&DeployConfig::default(), true).unwrap();
        assert!(connection.is_simulated());
    }
}
