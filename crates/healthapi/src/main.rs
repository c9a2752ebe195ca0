use anyhow::{Context, Result};
use clap::Parser;
use healthapi::{AppState, Environment};
use tracing::Level;
use tracing_subscriber::FmtSubscriber;

#[derive(Parser)]
#[command(name = "healthapi")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Sample Health API for QA testing", long_about = None)]
struct Args {
    /// Interface to bind
    #[arg(long, env = "HOST", default_value = "0.0.0.0")]
    host: String,

    /// Port to listen on
    #[arg(long, env = "PORT", default_value_t = 8000)]
    port: u16,

    /// Deployment environment
    #[arg(long, env = "ENVIRONMENT", value_enum, default_value = "development")]
    environment: Environment,

    /// Comma-separated CORS origins; `*` allows any
    #[arg(long, env = "ALLOWED_HOSTS", value_delimiter = ',', default_value = "*")]
    allowed_hosts: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .with_target(false)
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let addr = format!("{}:{}", args.host, args.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;

    tracing::info!(addr = %addr, environment = args.environment.as_str(), "Health API ready for testing");

    let state = AppState::new(args.environment).with_allowed_origins(args.allowed_hosts);
    healthapi::serve(listener, state, async {
        tokio::signal::ctrl_c().await.ok();
    })
    .await
    .context("server error")?;

    tracing::info!("Shutting down Health API");
    Ok(())
}
