use axum::{routing::get, Router};
use dumont4wp::{
    ContentLoader, Deployment, Dumont4wpError, FileOptionStore, HttpSearchClient,
    JsonDirContentSource, SettingsRepository, StaticCatalog,
};
use std::path::PathBuf;
use std::sync::Arc;
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::handlers::options::root_redirect;
use crate::handlers::{health, options_page, submit_options, AppState};

const DEFAULT_BIND_ADDR: &str = "127.0.0.1:7800";
const DEFAULT_SITE_ID: &str = "main";

/// Runtime configuration, read from the `DUMONT4WP_*` environment variables
/// the binary exports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServeConfig {
    pub data_dir: PathBuf,
    pub bind_addr: String,
    pub deployment: Deployment,
    pub content_types: StaticCatalog,
    pub content_dir: PathBuf,
    /// Un-escape backslash-quoted form values (transports that add quoting).
    pub magic_quotes: bool,
}

fn env_flag(name: &str) -> bool {
    std::env::var(name)
        .map(|v| matches!(v.trim().to_ascii_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(false)
}

fn env_non_empty(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

impl ServeConfig {
    pub fn from_env() -> Self {
        let data_dir =
            PathBuf::from(env_non_empty("DUMONT4WP_DATA_DIR").unwrap_or_else(|| "./data".into()));
        let bind_addr =
            env_non_empty("DUMONT4WP_BIND_ADDR").unwrap_or_else(|| DEFAULT_BIND_ADDR.to_string());
        let site_id = env_non_empty("DUMONT4WP_SITE_ID").unwrap_or_else(|| DEFAULT_SITE_ID.into());
        let deployment = if env_flag("DUMONT4WP_MULTISITE") {
            let main_site_id =
                env_non_empty("DUMONT4WP_MAIN_SITE_ID").unwrap_or_else(|| DEFAULT_SITE_ID.into());
            Deployment::multisite(site_id, main_site_id)
        } else {
            Deployment::single_site(site_id)
        };
        let content_types = env_non_empty("DUMONT4WP_CONTENT_TYPES")
            .map(|raw| StaticCatalog::from_csv(&raw))
            .unwrap_or_default();
        let content_dir = env_non_empty("DUMONT4WP_CONTENT_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|| data_dir.join("content"));

        Self {
            data_dir,
            bind_addr,
            deployment,
            content_types,
            content_dir,
            magic_quotes: env_flag("DUMONT4WP_MAGIC_QUOTES"),
        }
    }

    /// Wires the file-backed store, HTTP search client and JSON content
    /// source described by this configuration.
    pub fn build_state(&self) -> Result<Arc<AppState>, Dumont4wpError> {
        let backend = Arc::new(HttpSearchClient::new()?);
        Ok(Arc::new(AppState {
            repo: SettingsRepository::new(
                Arc::new(FileOptionStore::new(&self.data_dir)),
                self.deployment.clone(),
            ),
            catalog: Arc::new(self.content_types.clone()),
            backend: backend.clone(),
            loader: ContentLoader::new(
                backend,
                Arc::new(JsonDirContentSource::new(&self.content_dir)),
            ),
            form_action: "/options".to_string(),
            magic_quotes: self.magic_quotes,
            start_time: std::time::Instant::now(),
        }))
    }
}

pub fn build_router(state: Arc<AppState>) -> Router {
    Router::new()
        .route("/", get(root_redirect))
        .route("/options", get(options_page).post(submit_options))
        .route("/health", get(health))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

pub async fn serve() -> Result<(), Box<dyn std::error::Error>> {
    let startup_start = std::time::Instant::now();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = ServeConfig::from_env();
    std::fs::create_dir_all(&config.data_dir).map_err(|e| {
        Dumont4wpError::Config(format!(
            "cannot create data directory {}: {}",
            config.data_dir.display(),
            e
        ))
    })?;
    tracing::info!(
        data_dir = %config.data_dir.display(),
        site_id = %config.deployment.site_id,
        multisite = config.deployment.multisite,
        content_dir = %config.content_dir.display(),
        "Configuration loaded"
    );

    let app = build_router(config.build_state()?);

    let listener = tokio::net::TcpListener::bind(&config.bind_addr).await?;
    let local_addr = listener.local_addr()?;

    print_startup_banner(
        &local_addr.to_string(),
        startup_start.elapsed().as_millis(),
        &config,
    );

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

fn print_startup_banner(bind_addr: &str, startup_ms: u128, config: &ServeConfig) {
    use colored::Colorize;

    let url = format!("http://{}", bind_addr);
    let version = format!("v{}", env!("CARGO_PKG_VERSION"));
    let timing = format!("ready in {}ms", startup_ms);

    println!();
    println!(
        "  {} {}  {}",
        "Dumont4WP".bold().bright_green(),
        version.as_str().dimmed(),
        timing.as_str().dimmed(),
    );
    println!();
    println!("  {}  Local:      {}", "➜".green(), url.as_str().cyan());
    let options = format!("{}/options", url);
    println!("  {}  Settings:   {}", "➜".green(), options.as_str().cyan());
    let mode = if config.deployment.multisite {
        format!(
            "multisite (site {}, main {})",
            config.deployment.site_id, config.deployment.main_site_id
        )
    } else {
        format!("single site ({})", config.deployment.site_id)
    };
    println!("  {}  Mode:       {}", "➜".green(), mode.as_str().dimmed());
    println!(
        "  {}  Data:       {}",
        "➜".green(),
        config.data_dir.display().to_string().as_str().dimmed()
    );
    println!();
}
