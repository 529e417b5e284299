//! Archive Auth - Entry Point
//!
//! Serves the archive API, or manages registered OAuth clients.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::{Parser, Subcommand};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use archive_auth::{
    Config, CredentialStore, HttpState, Server, SystemClock,
    config::defaults,
    credentials::{self, SqliteCredentialStore},
    server::videos::MemoryVideoRecords,
};

#[derive(Parser, Debug)]
#[command(name = "archive-auth")]
#[command(about = "OAuth client_credentials server for the video archive API")]
#[command(version)]
struct Cli {
    /// SQLite credential database
    #[arg(long, default_value = defaults::DATABASE_PATH, env = "ARCHIVE_DATABASE", global = true)]
    database: PathBuf,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info", env = "RUST_LOG", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP server
    Serve {
        /// HTTP server port
        #[arg(long, default_value_t = defaults::PORT, env = "PORT")]
        port: u16,

        /// Secret cache TTL in seconds (0 disables the cache)
        #[arg(
            long,
            default_value_t = defaults::SECRET_CACHE_TTL.as_secs(),
            env = "ARCHIVE_SECRET_CACHE_TTL"
        )]
        secret_cache_ttl: u64,
    },

    /// Register a new OAuth client and print its credentials
    RegisterClient,

    /// List registered clients (without secrets)
    ListClients,
}

fn init_tracing(log_level: &str, json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    let subscriber = tracing_subscriber::registry().with(filter);

    // stdout carries command output (client credentials), so logs go to stderr
    let layer = tracing_subscriber::fmt::layer().with_writer(std::io::stderr);
    if json {
        subscriber.with(layer.json()).init();
    } else {
        subscriber.with(layer.compact()).init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    let cli = Cli::parse();

    init_tracing(&cli.log_level, cli.json_logs);

    match cli.command {
        Command::Serve {
            port,
            secret_cache_ttl,
        } => {
            let mut config = Config::new(cli.database)
                .with_secret_cache_ttl(Duration::from_secs(secret_cache_ttl));
            config.port = port;
            serve(config).await
        }
        Command::RegisterClient => {
            let store = SqliteCredentialStore::open(&cli.database)?;
            let credentials = store.register().await?;

            println!("client ID: {}", credentials.public_id);
            println!("client secret: {}", credentials.secret);
            Ok(())
        }
        Command::ListClients => {
            let store = SqliteCredentialStore::open(&cli.database)?;
            for client in store.list_clients().await? {
                println!(
                    "{}\t{}\t{}",
                    client.client_id,
                    client.public_id,
                    client.created_at.to_rfc3339()
                );
            }
            Ok(())
        }
    }
}

async fn serve(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        database = %config.database_path.display(),
        port = config.port,
        secret_cache = config.secret_cache_enabled(),
        "Starting archive auth server"
    );

    let store = credentials::open_store(&config)?;
    let videos = Arc::new(MemoryVideoRecords::new());
    let state = HttpState::new(store, Arc::new(SystemClock), videos);

    Server::new(state).run_http(config.port).await
}
