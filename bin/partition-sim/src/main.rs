use std::sync::Arc;

use canon_common::{env::parse_env_or, logging};
use canon_state::params::Params;
use tracing::*;

use crate::args::{get_config, Args};
use crate::sim::Simulation;

mod args;
mod errors;
mod sim;
mod stake;

/// Overrides how long we wait for nodes to settle, in seconds.
const SETTLE_TIMEOUT_ENVVAR: &str = "CANON_SIM_SETTLE_SECS";

fn main() -> anyhow::Result<()> {
    let args: Args = argh::from_env();
    if let Err(e) = main_inner(args) {
        eprintln!("FATAL ERROR: {e}");

        return Err(e);
    }

    Ok(())
}

fn main_inner(args: Args) -> anyhow::Result<()> {
    // Start runtime for the async relay.
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("canon-rt")
        .build()?;

    // Init the logging before we do anything else.
    logging::init(logging::LoggerConfig::with_base_name("canon-partition-sim"));

    let config = get_config(&args)?;
    debug!(?config, "loaded config");

    // Every node has to agree on genesis.
    let params = Arc::new(Params::default());

    let mut sim_config = config.sim.clone();
    sim_config.settle_timeout_secs =
        parse_env_or(SETTLE_TIMEOUT_ENVVAR, sim_config.settle_timeout_secs);

    let sim = Simulation::start(params, &config.consensus, sim_config)?;
    let played = runtime.block_on(sim.play());
    let report = sim.report();
    sim.shutdown()?;
    played?;

    println!("{}", serde_json::to_string_pretty(&report)?);

    if !report.converged {
        error!("nodes disagree on the active chain");
        logging::finalize();
        anyhow::bail!("nodes did not converge");
    }

    info!(best = %report.nodes[0].chain_info.best_block_hash, "all nodes converged");
    logging::finalize();
    Ok(())
}
