//! # SpeedH Accounts
//!
//! Lists the accounts the RPC endpoint can sign for, with balances, and
//! marks the one the orchestrator would deploy from.

use std::process::ExitCode;

use clap::Parser;
use speedh_deploy::cli::{banner, CommonArgs, Connection};
use speedh_deploy::{check_chain, logging, resolve_deployer, DeployResult};
use speedh_shared::constants::NATIVE_SYMBOL;
use speedh_shared::NativeAmount;
use tracing::error;

#[derive(Parser, Debug)]
#[command(
    name = "speedh_accounts",
    version,
    about = "List signer accounts exposed by the RPC endpoint"
)]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.common.verbose);

    banner("SPEEDH ACCOUNTS", "WHO CAN SIGN ON THIS ENDPOINT");

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("✗ failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&args)) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "account check failed");
            eprintln!("\n✗ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> DeployResult<()> {
    let config = args.common.load_config()?;
    let connection = Connection::open(&config, args.common.simulate)?;
    let backend = connection.backend();

    let chain_id = check_chain(backend.as_ref(), &config).await?;
    let accounts = backend.accounts().await?;
    println!("Network {} (chain {chain_id}), {} account(s)\n", config.network_name, accounts.len());

    for (index, account) in accounts.iter().enumerate() {
        let balance = NativeAmount::from_u256(backend.balance(*account).await?);
        println!("  [{index}] {}  {balance} {NATIVE_SYMBOL}", account.to_checksum(None));
    }

    let deployer = resolve_deployer(backend.as_ref(), &config).await?;
    println!("\nDeployer: {}", deployer.to_checksum(None));
    Ok(())
}
