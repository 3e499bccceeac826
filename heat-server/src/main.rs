use clap::Parser;
use heat_core::HeatKernel;
use heat_server::config::Args;
use heat_server::{AppContext, HeatServer};
use tracing::info;
use tracing_subscriber::prelude::*;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    args.validate()?;

    let state = args.build_state()?;
    let context = AppContext::new(state, Box::new(HeatKernel::new()));
    let server = HeatServer::bind(&args.listen_addr(), context)?;

    info!(
        addr = %args.listen_addr(),
        n = args.n,
        beta = args.beta,
        iterations = args.iterations,
        image_dir = ?args.image_dir,
        "heat server ready"
    );

    server.serve(args.workers);
    Ok(())
}
