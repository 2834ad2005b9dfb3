use std::path::PathBuf;

use clap::Parser;
use docvault_server::config::ServerSettings;
use docvault_server::{run_server, telemetry};

#[derive(Debug, Parser)]
#[command(
    name = "docvault",
    version,
    about = "Document collections with filtered, reranked retrieval"
)]
struct Cli {
    /// Settings file (YAML). Defaults to ./config.yaml when present.
    #[arg(short, long, env = "DOCVAULT_CONFIG")]
    config: Option<PathBuf>,

    /// Address to bind, overriding the settings file.
    #[arg(long)]
    host: Option<String>,

    /// Port to bind, overriding the settings file.
    #[arg(short, long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut settings = ServerSettings::load(cli.config.as_deref())?;
    if let Some(host) = cli.host {
        settings.server.host = host;
    }
    if let Some(port) = cli.port {
        settings.server.port = port;
    }

    let _guard = telemetry::init_logging(&settings.logging)?;
    run_server(settings).await
}
