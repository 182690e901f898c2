use clap::Parser;
use tracing::error;

use cv_export_lib::core::commands::{run, Cli};

#[tokio::main]
async fn main() {
    if let Err(err) = cv_export_lib::init_tracing() {
        eprintln!("failed to initialize logging: {err}");
    }

    let cli = Cli::parse();
    if let Err(err) = run(cli).await {
        error!("{err:#}");
        std::process::exit(1);
    }
}
