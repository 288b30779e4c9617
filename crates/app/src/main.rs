mod args;
mod build_info;
mod gateway;
mod logging;
mod op;
mod ops;
mod state;

use args::Args;
use clap::{Parser, Subcommand};
use op::Op;
use ops::{Init, Inspect, Publish, Version};
use tracing::level_filters::LevelFilter;

command_enum! {
    (Init, Init),
    (Publish, Publish),
    (Inspect, Inspect),
    (Version, Version),
}

#[tokio::main]
async fn main() {
    let args = Args::parse();

    // Log settings come from an initialized config dir when there is one
    let (level, log_dir) = match state::AppState::load(args.config_path.clone()) {
        Ok(state) => (state.config.log_level(), state.config.log_dir.clone()),
        Err(_) => (LevelFilter::INFO, None),
    };
    let guards = logging::init_logging(level, log_dir.as_deref());

    let ctx = match op::OpContext::new(args.gateway, args.config_path) {
        Ok(ctx) => ctx,
        Err(e) => {
            eprintln!("Error: Failed to create gateway client: {}", e);
            std::process::exit(1);
        }
    };

    let code = match args.command.execute(&ctx).await {
        Ok(output) => {
            println!("{}", output);
            0
        }
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("Error: {}", e);
            1
        }
    };

    // Flush the non-blocking writers before exiting
    drop(guards);
    std::process::exit(code);
}
