//! loadgauge CLI entry point.

use clap::Parser;
use loadgauge_cli::Cli;

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();
    loadgauge_cli::init_logging(cli.json_logs);

    match loadgauge_cli::run(cli).await {
        Ok(true) => {}
        Ok(false) => std::process::exit(1),
        Err(e) => {
            eprintln!("Error: {:#}", e);
            std::process::exit(2);
        }
    }
}
