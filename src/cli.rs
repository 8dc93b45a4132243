use clap::{Parser, Subcommand};
use log::info;
use std::net::SocketAddr;
use tuneseed::{
    api::{AppState, build_router},
    clients::{LocalStorage, errors::Result},
    config::{ConfigBuilder, Settings},
};

#[derive(Parser)]
#[command(name = "tuneseed")]
#[command(version, about = "Music recommendation API backed by Spotify", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP API
    Serve {
        /// Address to listen on, overrides BIND_ADDR
        #[arg(long)]
        bind: Option<SocketAddr>,
    },
    /// Create the storage tables and exit
    InitDb {},
}

pub async fn run() -> Result<()> {
    let cli = Cli::parse();

    info!("Loading settings ...");
    let settings = Settings::from_env()?;

    match cli.command {
        Commands::Serve { bind } => serve(settings, bind).await,
        Commands::InitDb {} => init_db(&settings).await,
    }
}

async fn serve(settings: Settings, bind: Option<SocketAddr>) -> Result<()> {
    let config = ConfigBuilder::new().build(&settings).await?;
    let app = build_router(AppState::new(config));

    let addr = bind.unwrap_or(settings.bind_addr);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on {addr}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    info!("Server stopped");
    Ok(())
}

async fn init_db(settings: &Settings) -> Result<()> {
    let storage = LocalStorage::open(&settings.store_url, &settings.db_name).await?;
    storage.init_db().await?;
    info!("Storage initialized");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        log::warn!("Failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
