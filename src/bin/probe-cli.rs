use clap::{Parser, Subcommand};
use serde_json::json;
use std::process::ExitCode;

#[derive(Parser)]
#[command(name = "probe-cli")]
#[command(
    about = "Query the liveness and readiness probes of an sre-probes service",
    long_about = None
)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[arg(long, default_value = "/livez")]
    live_path: String,

    #[arg(long, default_value = "/readyz")]
    ready_path: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Query the liveness probe
    Live,
    /// Query the readiness probe
    Ready,
    /// Query both probes
    Both,
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let probes = match cli.command {
        Commands::Live => vec![("livez", cli.live_path.as_str())],
        Commands::Ready => vec![("readyz", cli.ready_path.as_str())],
        Commands::Both => vec![
            ("livez", cli.live_path.as_str()),
            ("readyz", cli.ready_path.as_str()),
        ],
    };

    let mut all_healthy = true;
    for (probe, path) in probes {
        let healthy = print_probe(&client, probe, &format!("{base}{path}")).await?;
        all_healthy &= healthy;
    }

    Ok(if all_healthy {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

async fn print_probe(
    client: &reqwest::Client,
    probe: &str,
    url: &str,
) -> Result<bool, Box<dyn std::error::Error>> {
    let res = client.get(url).send().await?;
    let status = res.status();
    let healthy = status.is_success();
    let message = res.text().await?;

    let report = json!({
        "probe": probe,
        "status": status.as_u16(),
        "healthy": healthy,
        "message": message,
    });
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(healthy)
}
