// src/logging/logger.rs

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::{fmt, EnvFilter, Registry};

/// 默认日志级别，可通过 RUST_LOG 覆盖
const DEFAULT_FILTER: &str = "info";

/// 初始化全局 tracing 日志：JSON 行格式，按小时滚动写入 `log_dir/adx_bidder.json`。
/// 返回的 guard 需要持有到进程退出，否则缓冲区中的日志会丢失。
pub fn init(log_dir: &str) -> anyhow::Result<WorkerGuard> {
    let log_file = rolling::hourly(log_dir, "adx_bidder.json");
    let (non_blocking, guard) = tracing_appender::non_blocking(log_file);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer().json().with_writer(non_blocking));

    tracing::subscriber::set_global_default(subscriber)?;
    Ok(guard)
}
