//! Bootstrap a population and print a summary
//!
//! Usage: `cargo run -p lineage-runtime --example bootstrap [config.json]`

use std::process::ExitCode;

use tracing::{error, info};

use lineage_runtime::{logging, Bootstrap, RuntimeConfig};

fn main() -> ExitCode {
    let config = match std::env::args().nth(1) {
        Some(path) => match RuntimeConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                eprintln!("{}: {}", path, e);
                return ExitCode::FAILURE;
            }
        },
        None => RuntimeConfig::default(),
    };

    if let Err(e) = logging::init(&config.logging) {
        eprintln!("logging: {}", e);
        return ExitCode::FAILURE;
    }

    let output = match Bootstrap::new(config.bootstrap).and_then(Bootstrap::run) {
        Ok(output) => output,
        Err(e) => {
            error!(error = %e, "bootstrap failed");
            return ExitCode::FAILURE;
        }
    };

    for (generation, ids) in output.generations.iter().enumerate() {
        info!(generation, identities = ids.len(), "generation");
    }
    let stats = output.stats();
    info!(
        population = output.population(),
        events = stats.accepted,
        births = stats.births,
        "bootstrap complete"
    );
    ExitCode::SUCCESS
}
