use clap::Parser;
use tracing::info;

use habits_backend::server::{self, config::ServerConfig};
use habits_backend::version::VERSION;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to the configuration file
    #[arg(short, long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let args = Args::parse();

    let config = ServerConfig::load(args.config.as_deref())?;
    server::init_logging(&config.log_dir);
    info!(version = VERSION, port = config.port, "Starting habits server");

    server::run(config).await
}
