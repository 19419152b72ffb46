use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use mvps_portal::config::{AppConfig, ConfigFile, DEFAULT_LATENCY_MS};
use mvps_portal::storage::DEFAULT_QUOTA_BYTES;

const DEFAULT_APP_NAME: &str = "MVPS Portal";

#[allow(clippy::large_enum_variant)]
pub(crate) enum RunOutcome {
    Serve { config: AppConfig, port: u16 },
    Exit(i32),
}

pub(crate) fn run() -> RunOutcome {
    let cli = Cli::parse();

    let file = match cli.config.as_ref() {
        Some(path) => match ConfigFile::load(path) {
            Ok(file) => file,
            Err(err) => {
                eprintln!("error: {err}");
                return RunOutcome::Exit(2);
            }
        },
        None => ConfigFile::default(),
    };

    if let Err(err) = std::fs::create_dir_all(&cli.data_dir) {
        eprintln!("error: failed to create data directory: {err}");
        return RunOutcome::Exit(2);
    }
    let data_dir = match std::fs::canonicalize(&cli.data_dir) {
        Ok(data_dir) => data_dir,
        Err(err) => {
            eprintln!("error: failed to resolve data directory: {err}");
            return RunOutcome::Exit(2);
        }
    };

    let port = cli.port;
    RunOutcome::Serve {
        config: resolve_config(&cli, file, data_dir),
        port,
    }
}

/// Command-line flags win over the config file; the file wins over the
/// built-in defaults.
fn resolve_config(cli: &Cli, file: ConfigFile, data_dir: PathBuf) -> AppConfig {
    let latency_ms = cli
        .latency_ms
        .or(file.latency_ms)
        .unwrap_or(DEFAULT_LATENCY_MS);
    AppConfig {
        data_dir,
        app_name: cli
            .app_name
            .clone()
            .or(file.app_name)
            .unwrap_or_else(|| DEFAULT_APP_NAME.to_string()),
        latency: Duration::from_millis(latency_ms),
        storage_quota_bytes: cli
            .storage_quota_bytes
            .or(file.storage_quota_bytes)
            .unwrap_or(DEFAULT_QUOTA_BYTES),
        assistant_url: cli
            .assistant_url
            .clone()
            .or(file.assistant.map(|assistant| assistant.url)),
    }
}

#[derive(Parser, Debug)]
#[command(
    name = "mvps-portal",
    version,
    about = "School portal server with a capacity-limited key-value store"
)]
struct Cli {
    #[arg(long)]
    data_dir: PathBuf,
    #[arg(long)]
    config: Option<PathBuf>,
    #[arg(long)]
    app_name: Option<String>,
    #[arg(long, default_value_t = 3000)]
    port: u16,
    #[arg(long)]
    latency_ms: Option<u64>,
    #[arg(long)]
    storage_quota_bytes: Option<u64>,
    #[arg(long, env = "MVPS_ASSISTANT_URL")]
    assistant_url: Option<String>,
}
