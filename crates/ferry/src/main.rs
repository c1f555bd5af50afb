// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use clap::Parser;
use tracing::error;

use ferry::config::{sample_passengers, Config};
use ferry::console::StdinEventSource;
use ferry::log::Logger;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    if let Err(e) = config.validate() {
        eprintln!("error: {e}");
        std::process::exit(2);
    }

    init_tracing(&config);

    let logger = match Logger::new(config.log_path.clone()) {
        Ok(logger) => logger,
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    };

    let mut rng = rand::rng();
    let passengers = sample_passengers(config.p, config.bike_prob, &mut rng);
    let sim_config = config.as_sim_config();
    let event_source = StdinEventSource::new();

    match ferry::supervisor::run(sim_config, logger, passengers, event_source).await {
        Ok(outcome) => {
            for summary in &outcome.summaries {
                tracing::info!(
                    trip = summary.trip_no,
                    direction = %summary.direction,
                    passengers = summary.passengers,
                    bikes = summary.bikes,
                    aborted = summary.aborted,
                    "trip complete"
                );
            }
            std::process::exit(0);
        }
        Err(e) => {
            error!("fatal: {e:#}");
            std::process::exit(1);
        }
    }
}

/// Initialize tracing from config. Uses `try_init` so it's safe to call
/// more than once (e.g. from tests that construct a `Config` directly).
fn init_tracing(config: &Config) {
    use tracing_subscriber::EnvFilter;

    let filter = if std::env::var("RUST_LOG").is_err() && config.log_level == "info" {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level))
    } else {
        EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"))
    };

    let result = match config.log_format.as_str() {
        "json" => tracing_subscriber::fmt().with_env_filter(filter).json().try_init(),
        _ => tracing_subscriber::fmt().with_env_filter(filter).try_init(),
    };
    drop(result);
}
