use anyhow::Result;
use clap::Parser;
use lds_cache::cli::FetchLayerArgs;
use lds_cache::config::Config;
use lds_cache::{layer, logging};

#[tokio::main]
async fn main() -> Result<()> {
    let args = FetchLayerArgs::parse();

    let config = Config::from_args(&args.common)?;
    logging::init(&config);

    layer::handle(&config, &args).await
}
