use kanshi_core::config::LogConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, fmt};

/// # Summary
/// 初始化全局日志：控制台与按天滚动的文件。
///
/// # Logic
/// 1. `RUST_LOG` 优先，否则使用配置中的级别。
/// 2. 控制台输出紧凑格式，文件输出写入 `log.dir/kanshi.log.YYYY-MM-DD`，不带颜色。
///
/// # Returns
/// * 文件写入线程的守卫，必须持有到进程退出，否则缓冲日志会丢失。
pub fn init(config: &LogConfig) -> WorkerGuard {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{},hyper=warn,reqwest=warn", config.level)));

    let file_appender = tracing_appender::rolling::daily(&config.dir, "kanshi.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(true).compact())
        .with(fmt::layer().with_writer(file_writer).with_ansi(false))
        .init();

    guard
}
