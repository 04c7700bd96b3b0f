mod auth;
mod config;
mod errors;
mod intake;
mod routes;
mod state;
mod storage;
mod worksheet;

use anyhow::{Context, Result};
use aws_config::Region;
use aws_sdk_s3::config::Credentials;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{read_json_document, Config};
use crate::routes::build_router;
use crate::state::AppState;
use crate::storage::S3WorksheetStore;
use crate::worksheet::logo::LOGO_LOAD_TIMEOUT;
use crate::worksheet::{build_from_documents, load_logo, WorksheetConfig};

/// Rendered once at startup to prove the configured layout can produce a document.
const PREFLIGHT_ITEM: &str = "Upload your W2 forms from every employer for the tax year.";

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_CRATE_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting Worksheet API v{}", env!("CARGO_PKG_VERSION"));

    // Resolve layout/options once; every build shares the result read-only
    let worksheet = load_worksheet_config(&config).await?;
    info!(
        "Worksheet config: {:?} choices, {}x{}pt pages, logo {}",
        worksheet.options.choice_style,
        worksheet.layout.page_size.width,
        worksheet.layout.page_size.height,
        if worksheet.logo.is_present() { "present" } else { "absent" }
    );

    // Initialize S3 / MinIO
    let s3 = build_s3_client(&config).await;
    info!("S3 client initialized (bucket: {})", config.s3_bucket);

    // Build app state
    let state = AppState {
        store: Arc::new(S3WorksheetStore::new(s3, config.s3_bucket.clone())),
        worksheet: Arc::new(worksheet),
        config: config.clone(),
    };

    // Build router
    let app = build_router(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive());

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Reads and validates the worksheet documents, renders a preflight worksheet and
/// loads the logo. Any configuration problem stops startup; a bad logo only logs a warning.
async fn load_worksheet_config(config: &Config) -> Result<WorksheetConfig> {
    let layout_doc = read_json_document(&config.layout_config_path, true)?;
    let options_doc = read_json_document(&config.options_config_path, false)?;

    let resolved = WorksheetConfig::resolve(&layout_doc, &options_doc).with_context(|| {
        format!(
            "Invalid worksheet configuration in '{}' / '{}'",
            config.layout_config_path.display(),
            config.options_config_path.display()
        )
    })?;
    let preflight = build_from_documents(
        "Preflight",
        None,
        &[PREFLIGHT_ITEM.to_string()],
        &layout_doc,
        &options_doc,
    )
    .context("Worksheet configuration cannot render a document")?;
    info!(
        "Preflight worksheet rendered: {} page(s), {} bytes",
        preflight.page_count,
        preflight.pdf.len()
    );

    let logo = load_logo(resolved.layout.logo_path.as_deref().map(Path::new), LOGO_LOAD_TIMEOUT).await;
    Ok(resolved.with_logo(logo))
}

/// Constructs an S3 client configured for MinIO (local) or AWS (production).
async fn build_s3_client(config: &Config) -> aws_sdk_s3::Client {
    let credentials = Credentials::new(
        &config.aws_access_key_id,
        &config.aws_secret_access_key,
        None,
        None,
        "worksheet-static",
    );

    let sdk_config = aws_config::defaults(aws_config::BehaviorVersion::latest())
        .region(Region::new(config.s3_region.clone()))
        .credentials_provider(credentials)
        .endpoint_url(&config.s3_endpoint)
        .load()
        .await;

    // MinIO serves buckets by path, not by virtual host
    let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
        .force_path_style(true)
        .build();
    aws_sdk_s3::Client::from_conf(s3_config)
}
