use std::process::ExitCode;

use anyhow::Context;
use social_feed::maintenance::{self, Command, Outcome, USAGE};
use social_feed::Config;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();
    let config = match Config::from_env().context("Failed to load configuration") {
        Ok(config) => config,
        Err(e) => {
            eprintln!("repost-tool failed: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| maintenance::default_log_filter(&config).into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let command = match Command::parse(&args) {
        Ok(command) => command,
        Err(e) => {
            eprintln!("{}", USAGE);
            error!("repost-tool failed: {:#}", e);
            return ExitCode::FAILURE;
        }
    };

    match maintenance::run(&config, command).await {
        Ok(Outcome::Generated(report)) => info!(
            "{} dummy reposts created in {} batches for post: {}",
            report.created, report.batches, report.original_post_id
        ),
        Ok(Outcome::Purged(0)) => info!("No reposts found to delete."),
        Ok(Outcome::Purged(deleted)) => info!("Deleted {} reposts", deleted),
        Ok(Outcome::Usage) => println!("{}", USAGE),
        Err(e) => {
            error!("repost-tool failed: {:#}", e);
            return ExitCode::FAILURE;
        }
    }

    ExitCode::SUCCESS
}
