use clap::Parser;
use std::error::Error;
use std::sync::Arc;

use checkout::fulfillment::FulfillmentTracker;
use checkout::settlement::{LogReceiptSender, SettlementHandler};
use checkout::webhook::WebhookHandler;
use common::config::Config;
use store::pg::PgStorage;
use store::routes::{run_backend, AppState};

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to config file
    #[arg(short, long, default_value = "config/prostore.yaml")]
    config: String,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn Error + Send + Sync>> {
    println!("Starting backend...");
    dotenvy::dotenv().ok();

    let args = Args::parse();
    println!("Loading config from: {}", args.config);
    let config = Config::load(&args.config)?;
    store::initialize_tracing(&config.backend.log_level);

    let storage = Arc::new(PgStorage::new(&config.common.database_url).await?);
    let settlement = Arc::new(SettlementHandler::new(
        storage.clone(),
        Arc::new(LogReceiptSender),
    ));
    let state = AppState {
        webhook: Arc::new(WebhookHandler::new(
            config.payment.webhook_secret.clone(),
            settlement.clone(),
        )),
        settlement,
        fulfillment: Arc::new(FulfillmentTracker::new(storage.clone())),
    };

    run_backend(&config.backend, state).await
}
