//! # SpeedH Deploy
//!
//! Deploys missing contracts, wires the graph and writes the address book,
//! the per-network address dump and a Markdown transcript.
//!
//! ```bash
//! speedh_deploy --config speedh.toml --network telosTestnet
//! speedh_deploy --simulate --verify
//! ```

use std::process::ExitCode;

use clap::Parser;
use speedh_deploy::cli::{banner, panel, CommonArgs, Connection};
use speedh_deploy::{
    logging, ArtifactSource, DeployResult, HardhatArtifacts, Orchestrator, SimulatedArtifacts,
    VerificationProbe,
};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "speedh_deploy", version, about = "Deploy and wire the SpeedH contracts")]
struct Args {
    #[command(flatten)]
    common: CommonArgs,

    /// Run the verification probe after a successful deployment
    #[arg(long)]
    verify: bool,
}

fn main() -> ExitCode {
    let args = Args::parse();
    logging::init(args.common.verbose);

    banner("SPEEDH DEPLOY", "TWELVE CONTRACTS, ONE GRAPH");

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
            error!(error = %e, "deployment aborted");
            eprintln!("\n✗ {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> DeployResult<()> {
    let config = args.common.load_config()?;
    let connection = Connection::open(&config, args.common.simulate)?;

    let artifacts: Box<dyn ArtifactSource> = if connection.is_simulated() {
        Box::new(SimulatedArtifacts)
    } else {
        Box::new(HardhatArtifacts::new(&config.paths.artifacts_dir))
    };

    let rpc_label = if connection.is_simulated() {
        "in-memory".to_string()
    } else {
        config.rpc_url().to_string()
    };
    panel(
        "CONFIGURATION",
        &[
            ("Network", config.network_name.clone()),
            ("RPC", rpc_label),
            ("Address book", config.paths.address_book.display().to_string()),
            ("Logs", config.paths.logs_dir.display().to_string()),
        ],
    );

    let orchestrator = Orchestrator::new(connection.backend(), artifacts, config);
    let report = orchestrator.run().await?;

    panel(
        "DEPLOYMENT COMPLETE",
        &[
            ("Chain", report.chain_id.to_string()),
            ("Deployer", report.deployer.to_checksum(None)),
            ("Created", report.created.len().to_string()),
            ("Reused", report.reused.len().to_string()),
            ("Edges applied", report.edges_applied.to_string()),
            ("Transcript", report.transcript_path.display().to_string()),
            ("Address dump", report.dump_path.display().to_string()),
        ],
    );

    if args.verify {
        let probe = VerificationProbe::new(connection.backend(), report.book, report.chain_id);
        let records = probe.run(&mut std::io::stdout().lock()).await?;
        println!("\n✓ {} checks passed", records.len());
    }

    Ok(())
}
