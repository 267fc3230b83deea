use std::sync::Arc;

use anyhow::Result;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use resumatch::api_client::{ApiClient, ClientOptions};
use resumatch::config::Config;
use resumatch::realtime::SupabaseRealtime;
use resumatch::shell::Shell;
use resumatch::state::AppState;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Logs go to stderr so the console output stays readable
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    info!("Starting Resumatch console v{}", env!("CARGO_PKG_VERSION"));

    let api = ApiClient::with_options(
        config.api_base_url.clone(),
        ClientOptions {
            timeout: config.request_timeout,
            ..ClientOptions::default()
        },
    )?;
    info!("API client initialized (base URL: {})", api.base_url());

    let feed = SupabaseRealtime::new(&config.supabase_url, config.supabase_anon_key.clone())?;
    info!("Realtime feed configured");

    let state = AppState::new(api);
    let mut shell = Shell::new(state, Arc::new(feed));

    let stdin = BufReader::new(tokio::io::stdin());
    let mut stdout = std::io::stdout();
    shell.run(stdin, &mut stdout).await?;

    info!("Console closed");
    Ok(())
}
