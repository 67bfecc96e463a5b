use api::StoreConfig;
use api::Storefront;
use clap::Parser;

mod commands;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<(), api::ApiError> {
    let cli = Cli::parse();

    let config = StoreConfig::from_env();
    dioxus_logger::init(dioxus_logger::tracing::Level::INFO).expect("failed to init logger");
    dioxus_logger::tracing::debug!("using {:?}", config);
    let mut shop = Storefront::open(&config).await;

    cli.command.run(&mut shop).await
}
