use ferry_progress::{config::Configuration, error::FerryError, server, util::logging, wsf::WsfClient, FerryTracker};

async fn run() -> Result<(), FerryError> {
    let config = Configuration::load()?;

    logging::init_subscriber(config.logging.verbose);
    config.logging.apply();

    let source = WsfClient::from_config(&config);
    let tracker = FerryTracker::new(config)?;
    let rocket = server::build_rocket(&tracker)?;

    let poller = tracker.start_poller(source);
    let launched = rocket.launch().await;
    poller.shutdown().await;

    launched.map(|_| ()).map_err(|e| FerryError::Server(e.to_string()))
}

#[rocket::main]
async fn main() {
    if let Err(e) = run().await {
        // Config errors happen before the subscriber is installed.
        logging::init_subscriber(false);
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}
