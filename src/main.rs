use chat_relay::config::config_search_paths;
use chat_relay::providers::Provider;
use chat_relay::{build_router, AppState, RelayConfig, SharedLogger};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "chat-relay",
    about = "Relay Coze and DeepSeek chat requests with fallback and stream translation",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Send Coze-format requests straight to DeepSeek
    #[arg(long)]
    no_fallback: bool,

    /// Log file path
    #[arg(long, default_value = "chat-relay.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let dotenv = dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "chat_relay=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    if cli.show_config_paths {
        println!("Config search paths:");
        for (i, path) in config_search_paths().iter().enumerate() {
            println!("  {}. {}", i + 1, path.display());
        }
        return Ok(());
    }

    if let Some(path) = dotenv {
        info!(path = %path.display(), "Loaded environment file");
    }

    let mut config = RelayConfig::find_and_load(cli.config.as_deref())?;
    config.apply_env(|key| std::env::var(key).ok())?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if cli.no_fallback {
        config.fallback = false;
    }

    config.validate()?;

    let logger = SharedLogger::new(&cli.log_file)?;

    info!("╔═══════════════════════════════════════════════════════╗");
    info!("║           chat-relay v{}                           ║", env!("CARGO_PKG_VERSION"));
    info!("╚═══════════════════════════════════════════════════════╝");
    info!("  Coze:      {}", config.effective_url(Provider::Coze));
    info!("  DeepSeek:  {}", config.effective_url(Provider::DeepSeek));
    info!("  Routing:   {}", if config.coze_first() { "Coze first, DeepSeek fallback" } else { "DeepSeek only" });
    info!("  Timeout:   {}ms", config.request_timeout_ms);
    info!("  Max body:  {} bytes", config.max_request_size);
    info!("  Log file:  {}", cli.log_file.display());

    logger.info(
        "startup",
        format!(
            "Starting chat-relay port={} path={} coze_first={}",
            config.port,
            config.path,
            config.coze_first()
        ),
    );

    let client = reqwest::Client::builder()
        .connect_timeout(std::time::Duration::from_millis(config.request_timeout_ms))
        .build()?;

    let port = config.port;
    let path = config.path.clone();
    let state = Arc::new(AppState::new(config, client, logger.clone()));

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);
    info!("  Relay endpoint: http://localhost:{}{}", port, path);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    logger.info("shutdown", "Stopped chat-relay");
    logger.flush();

    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutting down"),
        Err(e) => {
            tracing::warn!("Cannot listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    }
}
