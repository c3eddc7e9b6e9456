use anyhow::Result;
use clap::{Parser, Subcommand};
use ripple_backend::api;
use ripple_backend::config::RippleConfig;
use ripple_backend::database::Database;
use ripple_backend::telemetry;

#[derive(Parser)]
#[command(author, version, about = "Ripple content-sharing backend")]
struct Args {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the HTTP server (Axum) for REST/API access
    Serve,
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init_tracing();

    let args = Args::parse();

    let config = RippleConfig::from_env()?;
    config.paths.ensure_dirs()?;
    let database = Database::connect(&config.paths)?;
    let fresh = database.ensure_migrations()?;
    tracing::info!(
        db_path = %config.paths.db_path.display(),
        fresh,
        "database ready"
    );

    match args.command.unwrap_or(Command::Serve) {
        Command::Serve => api::serve_http(config, database).await,
    }
}
