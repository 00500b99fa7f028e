use clap::Parser;
use tracing_subscriber::EnvFilter;

use fundpath::api::{Cli, Command, run_http_server, run_once};

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve { port } => {
            if let Err(e) = run_http_server(port).await {
                eprintln!("Server error: {e}");
                std::process::exit(1);
            }
        }
        Command::Run { args, pretty } => {
            let report = match tokio::task::spawn_blocking(move || run_once(&args)).await {
                Ok(Ok(report)) => report,
                Ok(Err(e)) => {
                    eprintln!("Projection error: {e}");
                    std::process::exit(1);
                }
                Err(e) => {
                    eprintln!("Projection task failed: {e}");
                    std::process::exit(1);
                }
            };
            let json = if pretty {
                serde_json::to_string_pretty(&report)
            } else {
                serde_json::to_string(&report)
            };
            match json {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Failed to encode report: {e}");
                    std::process::exit(1);
                }
            }
        }
    }
}
