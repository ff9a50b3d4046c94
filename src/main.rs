use clap::Parser;
use messages_bridge::config::config_search_paths;
use messages_bridge::logging::LogStage;
use messages_bridge::providers::ProviderPreset;
use messages_bridge::{build_router, AppState, Bridge, BridgeConfig, ChatTransport, HttpTransport, SharedLogger};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(
    name = "messages-bridge",
    about = "Serve the Messages API on top of any Chat Completions provider",
    version
)]
struct Cli {
    /// Path to config file (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config)
    #[arg(short, long)]
    port: Option<u16>,

    /// Provider name (overrides config)
    #[arg(long)]
    provider: Option<String>,

    /// Log file path
    #[arg(long, default_value = "messages-bridge.log")]
    log_file: PathBuf,

    /// Print config search paths and exit
    #[arg(long)]
    show_config_paths: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "messages_bridge=info,tower_http=info".into()),
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

    let mut config = BridgeConfig::find_and_load(cli.config.as_deref())?;

    if let Some(port) = cli.port {
        config.port = port;
    }
    if let Some(ref provider) = cli.provider {
        config.provider.name = provider.clone();
        if let Some(preset) = ProviderPreset::from_name(provider) {
            config.provider.base_url = Some(preset.base_url.to_string());
            config.provider.api_key_env = preset.default_api_key_env.to_string();
        }
    }

    let logger = SharedLogger::new(&cli.log_file)?;
    logger.compact()?;

    // Fails early on a missing key or unknown provider
    let transport = HttpTransport::from_config(&config)?;

    info!("messages-bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("  Provider:  {}", config.provider.name);
    info!("  Endpoint:  {}", transport.url());
    info!("  Port:      {}", config.port);
    info!("  Dropped:   {}", config.params.drop.join(", "));
    info!("  Log file:  {}", cli.log_file.display());

    logger.info(
        LogStage::Startup,
        format!(
            "Starting provider={} endpoint={} port={}",
            config.provider.name,
            transport.url(),
            config.port
        ),
    );

    let transport: Arc<dyn ChatTransport> = Arc::new(transport);
    let bridge = Bridge::new(transport)
        .with_dropped_params(config.params.drop.clone())
        .with_logger(logger.clone());

    let state = Arc::new(AppState { bridge, logger });

    let app = build_router(state);
    let bind_addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;

    info!("Listening on http://{}", bind_addr);

    axum::serve(listener, app).await?;

    Ok(())
}
