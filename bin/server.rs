// Bank App - Web Server

use bankapp::config::ServerConfig;
use bankapp::logging::init_logging;
use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "bank-server", version, about = "Bank web front end")]
struct Cli {
    #[command(flatten)]
    server: ServerConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(&cli.server.store.log_level, cli.server.store.log_format);

    bankapp::server::run(cli.server).await
}
