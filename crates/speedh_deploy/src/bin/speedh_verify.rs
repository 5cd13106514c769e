//! # SpeedH Verify
//!
//! Read-only check of a deployed graph: every wiring edge is read back
//! through its accessor, then every `version()`. Exits non-zero on the
//! first mismatch.
//!
//! With `--simulate` the graph is first deployed into an in-memory chain,
//! which makes this a self-contained smoke test of the whole toolchain.

use std::process::ExitCode;

use clap::Parser;
use speedh_deploy::cli::{banner, CommonArgs, Connection};
use speedh_deploy::{
    check_chain, logging, DeployResult, Orchestrator, SimulatedArtifacts, VerificationProbe,
};
use speedh_shared::AddressBook;
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "speedh_verify", version, about = "Verify SpeedH contract wiring")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.common.verbose);

    banner("SPEEDH VERIFY", "READ-ONLY WIRING AND VERSION CHECKS");

    let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(e) => {
            eprintln!("✗ failed to start runtime: {e}");
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(&args)) {
        Ok(checks) => {
            println!("\n✓ all {checks} checks passed");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "verification failed");
            eprintln!("\n✗ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> DeployResult<usize> {
    let config = args.common.load_config()?;
    let connection = Connection::open(&config, args.common.simulate)?;
    let backend = connection.backend();

    let (book, chain_id) = if connection.is_simulated() {
        let report = Orchestrator::new(backend.clone(), Box::new(SimulatedArtifacts), config)
            .run()
            .await?;
        (report.book, report.chain_id)
    } else {
        let chain_id = check_chain(backend.as_ref(), &config).await?;
        (AddressBook::load(&config.paths.address_book)?, chain_id)
    };

    println!("Verifying chain {chain_id}\n");
    let probe = VerificationProbe::new(backend, book, chain_id);
    let records = probe.run(&mut std::io::stdout().lock()).await?;
    Ok(records.len())
}
