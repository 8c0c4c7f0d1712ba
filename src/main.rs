mod cli;

use anyhow::Result;
use clap::Parser;
use dotenv::dotenv;
use std::path::Path;
use std::sync::Arc;

use cli::{Cli, Commands};
use food_snap::config::Config;
use food_snap::handlers::{render, CaptureClient, SelectedFile};
use food_snap::services::HttpBridgeClient;

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables before the logger reads RUST_LOG
    dotenv().ok();
    env_logger::init();

    let cli = Cli::parse();
    let config = Config::from_env();

    match cli.command {
        Commands::Serve { bind } => serve(config, bind).await,
        Commands::Analyze { file, url } => {
            let bridge_url = url.unwrap_or_else(|| config.bridge_url.clone());
            analyze_file(&file, &bridge_url).await
        }
    }
}

#[cfg(feature = "server")]
async fn serve(config: Config, bind: Option<String>) -> Result<()> {
    use food_snap::services::{AnalysisBridge, OpenRouterService};

    log::info!("🚀 Starting Food Snap analysis bridge...");

    let openrouter = Arc::new(OpenRouterService::from_config(&config));
    log::info!("✅ OpenRouter service initialized with model: {}", openrouter.model());

    let app = food_snap::api::server::create_router(AnalysisBridge::new(openrouter));

    let addr = bind.unwrap_or(config.bind_addr);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    log::info!("🌐 Analysis bridge listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            log::info!("🛑 Shutting down...");
        })
        .await?;

    Ok(())
}

#[cfg(not(feature = "server"))]
async fn serve(_config: Config, _bind: Option<String>) -> Result<()> {
    anyhow::bail!("built without the `server` feature")
}

async fn analyze_file(path: &Path, bridge_url: &str) -> Result<()> {
    let bytes = tokio::fs::read(path).await?;
    let file = SelectedFile {
        name: path.display().to_string(),
        mime_type: cli::mime_type_for(path).to_string(),
        bytes,
    };

    let client = CaptureClient::new(Arc::new(HttpBridgeClient::new(bridge_url)));

    let outcome = match client.select_file(file).await {
        Ok(()) => client
            .request_analysis()
            .await
            .map(|_| ())
            .map_err(anyhow::Error::from),
        Err(e) => Err(e.into()),
    };

    print!("{}", render(&client.view()));
    outcome
}
