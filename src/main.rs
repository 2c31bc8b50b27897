use std::path::PathBuf;

use clap::Parser;
use operator::{
    init_logging,
    network::{self, AppState},
    LogFormat, RendezvousEngine, Settings, SettingsOverrides,
};
use tracing::{error, info};

#[derive(Parser)]
#[command(name = "operator")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Operator facilitates WebRTC signaling", long_about = None)]
struct Cli {
    /// Адрес HTTP-сервера
    #[arg(long, help = "the address to bind")]
    bind_addr: Option<String>,
    /// Файл настроек (TOML, YAML, JSON)
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Максимальный размер поля data в байтах
    #[arg(long)]
    max_message_size: Option<usize>,
    /// Таймаут ожидания встречной стороны в секундах
    #[arg(long)]
    timeout: Option<u64>,
    /// Уровень логирования или директива фильтра
    #[arg(long)]
    log_level: Option<String>,
    #[arg(long, value_enum)]
    log_format: Option<LogFormat>,
}

impl Cli {
    fn overrides(&self) -> SettingsOverrides {
        SettingsOverrides {
            bind_addr: self.bind_addr.clone(),
            max_message_size: self.max_message_size,
            request_timeout_secs: self.timeout,
            log_level: self.log_level.clone(),
            log_format: self.log_format,
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::load(cli.config.as_deref(), &cli.overrides())?;
    let logging = init_logging(&settings.logging)?;

    info!(
        bind_addr = %settings.bind_addr,
        max_message_size = settings.max_message_size,
        request_timeout_secs = settings.request_timeout_secs,
        "operator starting"
    );

    let engine = RendezvousEngine::new(settings.engine);
    let result = run(&settings, engine.clone()).await;

    engine.shutdown().await;
    if let Err(err) = &result {
        error!(error = %err, "operator failed");
    }
    logging.shutdown();
    result
}

async fn run(
    settings: &Settings,
    engine: RendezvousEngine,
) -> anyhow::Result<()> {
    let listener = network::bind(&settings.bind_addr).await?;
    let state = AppState::new(engine, settings);
    network::serve(listener, state, shutdown_signal()).await?;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
}
