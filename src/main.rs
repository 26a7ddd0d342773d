use std::process::ExitCode;

use clap::Parser;
use tracing::error;
use wishing_star::config::{AppConfig, BotSettings, Credentials};
use wishing_star::{bootstrap, logger};

/// 日志初始化之后的顶层错误退出码（-1）
const EXIT_RUNTIME_FAILURE: u8 = 255;

#[tokio::main]
async fn main() -> ExitCode {
    let cfg = AppConfig::parse();

    let settings = match BotSettings::load_optional(cfg.settings.as_deref()) {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("{}", e);
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = logger::init(settings.log_config()) {
        eprintln!("failed to initialize logging: {}", e);
        return ExitCode::FAILURE;
    }

    let credentials = match Credentials::load(&cfg.key) {
        Ok(credentials) => credentials,
        Err(e) => {
            error!("{}", e);
            return ExitCode::from(EXIT_RUNTIME_FAILURE);
        }
    };

    match bootstrap::launch(credentials, settings).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(EXIT_RUNTIME_FAILURE)
        }
    }
}
