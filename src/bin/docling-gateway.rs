//! CLI binary for docling-gateway.
//!
//! A thin shim over the library crate: maps flags and environment variables
//! onto `GatewayConfig`, then either hosts one of the envelopes or runs a
//! single local conversion.

use anyhow::{Context, Result};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use clap::{Args, Parser, Subcommand};
use docling_gateway::config::{DEFAULT_DOCLING_URL, DEFAULT_MAX_BODY_BYTES, DEFAULT_SERVICE_NAME};
use docling_gateway::model::DEFAULT_IMAGE_SCALE;
use docling_gateway::pipeline::{input, shape};
use docling_gateway::{convert, shared_backend, GatewayConfig, ResponseMode};
use serde_json::{json, Value};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::info;
use tracing_subscriber::EnvFilter;

const AFTER_HELP: &str = r#"EXAMPLES:
  # Serve POST /convert and POST /convert/full on :8080
  docling-gateway serve

  # Convert a remote PDF and print the markdown
  docling-gateway convert https://arxiv.org/pdf/2408.09869

  # Markdown plus extracted images as a zip bundle
  docling-gateway convert report.pdf --full -o report.zip

ENVIRONMENT:
  DOCLING_SERVE_URL        docling-serve base URL (default http://127.0.0.1:5001)
  DOCLING_SERVE_API_KEY    sent as X-Api-Key when set
  RUST_LOG                 overrides the log filter
"#;

/// Document → Markdown gateway in front of docling-serve.
#[derive(Parser, Debug)]
#[command(
    name = "docling-gateway",
    version,
    about = "Document to Markdown gateway in front of docling-serve",
    arg_required_else_help = true,
    color = clap::ColorChoice::Auto,
    after_long_help = AFTER_HELP
)]
struct Cli {
    #[command(flatten)]
    backend: BackendArgs,

    /// Enable DEBUG-level tracing logs.
    #[arg(short, long, env = "DOCLING_GATEWAY_VERBOSE")]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug)]
struct BackendArgs {
    /// docling-serve base URL.
    #[arg(long, env = "DOCLING_SERVE_URL", default_value = DEFAULT_DOCLING_URL)]
    docling_url: String,

    /// API key for docling-serve.
    #[arg(long, env = "DOCLING_SERVE_API_KEY", hide_env_values = true)]
    api_key: Option<String>,

    /// Backend request timeout in seconds.
    #[arg(long, env = "DOCLING_GATEWAY_TIMEOUT", default_value_t = 300)]
    timeout: u64,

    /// Ask docling to run OCR on bitmap content.
    #[arg(long, env = "DOCLING_GATEWAY_OCR")]
    ocr: bool,

    /// Service name reported by health checks.
    #[arg(long, env = "DOCLING_GATEWAY_SERVICE_NAME", default_value = DEFAULT_SERVICE_NAME)]
    service_name: String,

    /// Largest request body `serve` accepts, in bytes.
    #[arg(long, env = "DOCLING_GATEWAY_MAX_BODY_BYTES", default_value_t = DEFAULT_MAX_BODY_BYTES)]
    max_body_bytes: usize,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Serve the HTTP API (POST /convert, POST /convert/full, GET /health).
    #[cfg(feature = "server")]
    Serve {
        /// Listen address.
        #[arg(long, env = "DOCLING_GATEWAY_BIND", default_value = "0.0.0.0:8080")]
        bind: std::net::SocketAddr,
    },

    /// Run as an AWS Lambda function (API Gateway, Function URL, direct invoke).
    #[cfg(feature = "lambda")]
    Lambda,

    /// Convert one local file or URL.
    Convert {
        /// Local file path or HTTP/HTTPS URL.
        input: String,

        /// Produce the zip bundle (markdown + images) instead of markdown.
        #[arg(long)]
        full: bool,

        /// Output file. Required with --full; markdown goes to stdout otherwise.
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Filename hint sent to docling (defaults to the input's file name).
        #[arg(long)]
        filename: Option<String>,

        /// Ask docling to generate table images.
        #[arg(long)]
        tables_as_images: bool,

        /// Image resolution scale (greater than 0, at most 10).
        #[arg(long, default_value_t = DEFAULT_IMAGE_SCALE)]
        image_scale: f64,
    },
}

impl BackendArgs {
    fn to_config(&self) -> Result<GatewayConfig> {
        let mut builder = GatewayConfig::builder()
            .docling_url(&self.docling_url)
            .request_timeout_secs(self.timeout)
            .do_ocr(self.ocr)
            .service_name(&self.service_name)
            .max_body_bytes(self.max_body_bytes);
        if let Some(key) = &self.api_key {
            builder = builder.api_key(key);
        }
        builder.build().context("Invalid gateway configuration")
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // ── Logging setup ────────────────────────────────────────────────────
    let filter = if cli.verbose { "debug" } else { "info" };
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_writer(io::stderr);

    // CloudWatch does not render ANSI colours.
    #[cfg(feature = "lambda")]
    let subscriber = subscriber.with_ansi(!matches!(cli.command, Command::Lambda));

    subscriber.init();

    let config = cli.backend.to_config()?;
    info!("Backend: {:?}", config);

    match cli.command {
        #[cfg(feature = "server")]
        Command::Serve { bind } => serve(config, bind).await,

        #[cfg(feature = "lambda")]
        Command::Lambda => run_lambda(config).await,

        Command::Convert {
            input,
            full,
            output,
            filename,
            tables_as_images,
            image_scale,
        } => {
            let payload = local_payload(&input, filename, tables_as_images, image_scale).await?;
            let mode = if full {
                ResponseMode::Export
            } else {
                ResponseMode::Markdown
            };
            convert_local(&config, payload, mode, output.as_deref()).await
        }
    }
}

// ── serve ────────────────────────────────────────────────────────────────────

#[cfg(feature = "server")]
async fn serve(config: GatewayConfig, bind: std::net::SocketAddr) -> Result<()> {
    use docling_gateway::{router, AppState};

    let backend = shared_backend(&config)?;
    let app = router(AppState::new(backend, config));

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    info!("Listening on {}", bind);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("Server shutdown complete");
    Ok(())
}

#[cfg(feature = "server")]
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Ctrl+C handler unavailable: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::warn!("SIGTERM handler unavailable: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C, starting graceful shutdown..."),
        _ = terminate => info!("Received SIGTERM, starting graceful shutdown..."),
    }
}

// ── lambda ───────────────────────────────────────────────────────────────────

#[cfg(feature = "lambda")]
async fn run_lambda(config: GatewayConfig) -> Result<()> {
    use docling_gateway::{handle_event, ProxyResponse};
    use lambda_runtime::{service_fn, LambdaEvent};
    use std::sync::Arc;

    let config = Arc::new(config);
    lambda_runtime::run(service_fn(move |event: LambdaEvent<Value>| {
        let config = Arc::clone(&config);
        async move {
            // Initialised on the first invocation, reused while the container is warm.
            let backend = shared_backend(&config)?;
            let response = handle_event(event.payload, backend.as_ref(), &config).await;
            Ok::<ProxyResponse, lambda_runtime::Error>(response)
        }
    }))
    .await
    .map_err(|e| anyhow::anyhow!(e))
}

// ── convert ──────────────────────────────────────────────────────────────────

/// Build the same JSON body a remote caller would send.
async fn local_payload(
    input: &str,
    filename: Option<String>,
    tables_as_images: bool,
    image_scale: f64,
) -> Result<Value> {
    let mut payload = json!({
        "extract_tables_as_images": tables_as_images,
        "image_resolution_scale": image_scale,
    });

    if input::is_url(input) {
        payload["source_url"] = Value::from(input);
    } else {
        let path = Path::new(input);
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        payload["document"] = Value::from(STANDARD.encode(bytes));
        if filename.is_none() {
            if let Some(name) = path.file_name().and_then(|n| n.to_str()) {
                payload["filename"] = Value::from(name);
            }
        }
    }
    if let Some(name) = filename {
        payload["filename"] = Value::from(name);
    }
    Ok(payload)
}

async fn convert_local(
    config: &GatewayConfig,
    payload: Value,
    mode: ResponseMode,
    output: Option<&Path>,
) -> Result<()> {
    let request = input::resolve_request(&payload)?;
    let backend = shared_backend(config)?;

    let start = Instant::now();
    let result = convert(&request, mode, backend.as_ref())
        .await
        .with_context(|| format!("Conversion of {} failed", request.source_label()))?;

    match mode {
        ResponseMode::Markdown => match output {
            Some(path) => write_atomic(path, result.markdown.as_bytes()).await?,
            None => {
                let mut stdout = io::stdout().lock();
                stdout.write_all(result.markdown.as_bytes())?;
                stdout.flush()?;
            }
        },
        ResponseMode::Export => {
            let path = output.context("--full writes a zip archive; pass -o/--output")?;
            let stem = shape::archive_stem(&result.source_label);
            let archive = shape::build_archive(&result, &stem)?;
            write_atomic(path, &archive).await?;
        }
    }

    eprintln!(
        "Converted {} ({} pages, {} images) in {:.1}s",
        result.source_label,
        result.page_count,
        result.images.len(),
        start.elapsed().as_secs_f64()
    );
    Ok(())
}

/// Write to a sibling temp file, then rename over the target.
async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let mut tmp_name = path.as_os_str().to_owned();
    tmp_name.push(".tmp");
    let tmp_path = PathBuf::from(tmp_name);

    tokio::fs::write(&tmp_path, bytes)
        .await
        .with_context(|| format!("Failed to write {}", tmp_path.display()))?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .with_context(|| format!("Failed to move output into {}", path.display()))?;
    Ok(())
}
