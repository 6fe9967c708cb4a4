// 로깅 초기화
// tracing subscriber: EnvFilter (RUST_LOG, default info) + fmt layer
use anyhow::{Context, Result};
use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, EnvFilter, Registry};
use crate::shared::config::LogFormat;

pub fn init(format: LogFormat) -> Result<()> {
    // RUST_LOG=
    let env_filter = EnvFilter::builder()
        .with_default_directive(Level::INFO.into())
        .from_env_lossy();

    match format {
        LogFormat::Json => {
            let subscriber = Registry::default()
                .with(env_filter)
                .with(fmt::layer().json().with_current_span(false).with_target(true));
            tracing::subscriber::set_global_default(subscriber)
        }
        LogFormat::Text => {
            let subscriber = Registry::default()
                .with(env_filter)
                .with(fmt::layer().with_target(false).with_line_number(true));
            tracing::subscriber::set_global_default(subscriber)
        }
    }
    .context("Failed to install tracing subscriber")
}
