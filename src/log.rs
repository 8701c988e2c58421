// Logging setup on tracing, plus the few structured events the server emits
use tracing_subscriber::fmt::MakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Subscriber for startup, before the config says how to log. Install it
/// scoped with `tracing::subscriber::with_default`.
pub fn bootstrap<W>(writer: W) -> impl tracing::Subscriber + Send + Sync
where
    W: for<'w> MakeWriter<'w> + Send + Sync + 'static,
{
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_writer(writer)
        .with_target(false)
        .with_ansi(false)
        .compact()
        .with_env_filter(env_filter)
        .finish()
}

/// Install the global subscriber. `RUST_LOG` wins over `level`. Safe to call
/// more than once; later calls are ignored.
pub fn init(enabled: bool, level: &str) {
    if !enabled {
        return;
    }
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(normalize_level(level)));
    let console = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stdout)
        .with_target(false)
        .compact();
    let _ = tracing_subscriber::registry().with(env_filter).with(console).try_init();
}

pub fn normalize_level(level: &str) -> &'static str {
    match level.to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" => "error",
        _ => "info",
    }
}

pub fn filter_installed(name: &str) {
    tracing::info!(filter = name, "header filter installed");
}

pub fn request(method: &str, target: &str, ip: &str) {
    tracing::info!(%method, %target, client = %ip, "request");
}

pub fn response(ip: &str, status: u16, ms: u128) {
    tracing::info!(client = %ip, status, elapsed_ms = ms as u64, "response");
}
