pub mod models;
pub mod services;
pub mod api;

use anyhow::Context;
use services::detection::{ClassifierGateway, ClassifierOracle, LabeledClassifier, VerdictClassifier};
use services::provenance::ProvenanceCache;
use services::rewrite::{GroqRewriter, RefinementLoop};
use services::{get_api_key, AppConfig, ConfigStore, Humanizer, ProviderClient};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

const LOG_FILE_PREFIX: &str = "humanizeAI_";
const LOGS_TO_KEEP: usize = 30;

fn env_flag(name: &str) -> bool {
    matches!(std::env::var(name).as_deref(), Ok("1") | Ok("true") | Ok("TRUE"))
}

/// Initialize logging system with timestamped log files
pub fn init_logging() {
    let disable_file_log = env_flag("HUMANIZER_DISABLE_FILE_LOG");
    let disable_cleanup = env_flag("HUMANIZER_DISABLE_LOG_CLEANUP");

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    if disable_file_log {
        init_console_only_logging(env_filter);
        info!("File logging disabled via HUMANIZER_DISABLE_FILE_LOG");
        return;
    }

    let logs_dir = match std::env::var("HUMANIZER_LOG_DIR") {
        Ok(p) if !p.trim().is_empty() => PathBuf::from(p),
        _ => get_logs_dir(),
    };

    if let Err(e) = fs::create_dir_all(&logs_dir) {
        eprintln!("Failed to create logs directory: {}", e);
        init_console_only_logging(env_filter);
        info!("Falling back to console-only logging (log dir not writable)");
        return;
    }

    let timestamp = chrono::Local::now().format("%Y%m%d_%H%M%S");
    let log_filename = format!("{}{}.log", LOG_FILE_PREFIX, timestamp);

    let file_appender = rolling::never(&logs_dir, &log_filename);
    let (file_writer, file_guard) = tracing_appender::non_blocking(file_appender);
    let _ = LOG_GUARD.set(file_guard);

    let file_layer = fmt::layer()
        .with_writer(file_writer)
        .with_ansi(false)
        .with_target(true)
        .with_file(true)
        .with_line_number(true);

    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(file_layer)
            .init();
    }

    info!("=== HumanizeAI Started ===");
    info!("Log file: {}/{}", logs_dir.display(), log_filename);
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    if !disable_cleanup {
        std::thread::spawn(move || {
            cleanup_old_logs(&logs_dir, LOGS_TO_KEEP);
        });
    }
}

fn get_logs_dir() -> PathBuf {
    #[cfg(debug_assertions)]
    {
        PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("logs")
    }

    #[cfg(not(debug_assertions))]
    {
        if let Some(data_dir) = dirs::data_local_dir() {
            return data_dir.join("humanizeAI").join("logs");
        }
        PathBuf::from("logs")
    }
}

fn cleanup_old_logs(logs_dir: &Path, keep: usize) {
    let mut entries: Vec<_> = match fs::read_dir(logs_dir) {
        Ok(rd) => rd.filter_map(|e| e.ok()).collect(),
        Err(_) => return,
    };

    entries.retain(|e| {
        let name = e.file_name().to_string_lossy().to_string();
        name.starts_with(LOG_FILE_PREFIX) && name.ends_with(".log")
    });

    if entries.len() <= keep {
        return;
    }

    entries.sort_by_key(|e| {
        e.metadata()
            .and_then(|m| m.modified())
            .unwrap_or(std::time::SystemTime::UNIX_EPOCH)
    });

    let remove_count = entries.len().saturating_sub(keep);
    for entry in entries.into_iter().take(remove_count) {
        let _ = fs::remove_file(entry.path());
    }
}

fn init_console_only_logging(env_filter: EnvFilter) {
    #[cfg(debug_assertions)]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stdout)
            .with_ansi(true)
            .with_target(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
    }

    #[cfg(not(debug_assertions))]
    {
        let console_layer = fmt::layer()
            .with_writer(std::io::stderr)
            .with_ansi(false)
            .with_target(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .init();
    }
}

/// Load `config.json` from the default config dir (if any) and apply env overrides.
pub fn load_config() -> AppConfig {
    let mut config = match ConfigStore::default_config_dir() {
        Some(dir) => ConfigStore::new(dir).load().unwrap_or_else(|e| {
            warn!("Config unreadable, using defaults: {}", e);
            AppConfig::default()
        }),
        None => AppConfig::default(),
    };
    config.apply_env_overrides();
    config
}

/// Classifier gateway with whichever oracles have credentials.
pub fn build_gateway(config: &AppConfig, client: &Arc<ProviderClient>) -> ClassifierGateway {
    let primary = get_api_key("huggingface").map(|key| {
        Arc::new(LabeledClassifier::new(
            client.clone(),
            key,
            config.oracles.detector_model.clone(),
        )) as Arc<dyn ClassifierOracle>
    });
    let secondary = get_api_key("groq").map(|key| {
        Arc::new(VerdictClassifier::new(
            client.clone(),
            key,
            config.oracles.judge_model.clone(),
        )) as Arc<dyn ClassifierOracle>
    });

    info!(
        "Oracles: labeled={} verdict={}",
        if primary.is_some() { "on" } else { "off" },
        if secondary.is_some() { "on" } else { "off" }
    );

    ClassifierGateway::new(
        primary,
        secondary,
        Duration::from_secs(config.oracles.timeout_secs),
    )
}

/// Wire the full rewrite/score service from configuration.
pub fn build_humanizer(config: &AppConfig) -> Humanizer {
    let client = Arc::new(ProviderClient::with_urls(
        config.provider_url("groq"),
        config.provider_url("huggingface"),
    ));
    let gateway = build_gateway(config, &client);

    let groq_key = get_api_key("groq");
    if groq_key.is_none() {
        warn!("GROQ_API_KEY not configured; rewrite requests will fail");
    }
    let generator = Arc::new(GroqRewriter::new(
        client,
        groq_key,
        config.oracles.generator_model.clone(),
    ));

    Humanizer::new(
        RefinementLoop::new(generator, gateway.clone(), &config.refinement),
        gateway,
        ProvenanceCache::in_memory(&config.provenance),
    )
}

/// Run the HTTP service until the listener fails.
pub async fn run() -> anyhow::Result<()> {
    let start = Instant::now();
    init_logging();

    let config = load_config();
    let state = Arc::new(api::AppState {
        humanizer: build_humanizer(&config),
    });
    let app = api::router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {}", addr))?;
    info!(
        startup_ms = start.elapsed().as_millis() as u64,
        "HumanizeAI listening on {}", addr
    );

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .context("server error")?;

    info!("=== HumanizeAI Exited ===");
    Ok(())
}
