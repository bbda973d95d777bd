mod logging;
mod settings;

use std::sync::Arc;
use std::time::Duration;

use kanshi_api::server::{AppState, start_server};
use kanshi_core::common::time::{RealTimeProvider, TimeProvider};
use kanshi_core::market::port::MarketDataSource;
use kanshi_core::notify::port::Notifier;
use kanshi_core::reasoning::port::ReasoningService;
use kanshi_engine::calendar::TradingCalendar;
use kanshi_engine::pipeline::{AnalysisPipeline, PipelineParams};
use kanshi_feed::tdx::TdxProvider;
use kanshi_manager::monitor::MonitorRegistry;
use kanshi_notify::multi::MultiNotifier;
use kanshi_reasoning::chat::ChatClient;
use tracing::{error, info, warn};

/// # Summary
/// 应用启动入口，纯粹的 DI 容器。
/// 负责实例化所有具体实现组件并通过 Arc<dyn Trait> 注入到分析流水线。
///
/// # Logic
/// 1. 安装 TLS 加密后端，加载 .env 与配置文件。
/// 2. 初始化全局日志。
/// 3. 实例化行情源、推理服务、通知器与交易日历。
/// 4. 为每只启用的股票构建流水线并注册。
/// 5. 启动管理接口与全部调度。
/// 6. 挂起等待 Ctrl+C，然后停止所有调度。
#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. reqwest 与 lettre 均使用 rustls，需要进程级加密后端
    let provider_installed = rustls::crypto::ring::default_provider()
        .install_default()
        .is_ok();
    let env_loaded = dotenvy::dotenv().is_ok();
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| settings::DEFAULT_CONFIG_PATH.to_string());
    let config = settings::load(&config_path)?;

    // 2. 初始化日志
    let _log_guard = logging::init(&config.log);
    info!("Kanshi stock monitor starting...");
    info!(path = %config_path, env_loaded, "configuration loaded");
    if !provider_installed {
        warn!("rustls crypto provider was already installed");
    }

    // 3. 实例化基础设施层
    let market: Arc<dyn MarketDataSource> = Arc::new(TdxProvider::new(
        &config.market.base_url,
        Duration::from_secs(config.market.timeout_secs),
    )?);
    info!(url = %config.market.base_url, "market data source initialized");

    let chat = ChatClient::from_config(&config.ai)?;
    info!(provider = %config.ai.provider, model = %chat.model(), "reasoning service initialized");
    let reasoning: Arc<dyn ReasoningService> = Arc::new(chat);

    let notifier: Option<Arc<dyn Notifier>> = match MultiNotifier::from_config(&config.notification)? {
        Some(multi) => Some(Arc::new(multi)),
        None => {
            info!("notification disabled");
            None
        }
    };

    let calendar = Arc::new(TradingCalendar::from_config_or_default(&config.trading_time));
    let clock: Arc<dyn TimeProvider> = Arc::new(RealTimeProvider);
    let status = calendar.status(clock.now());
    info!(
        check_enabled = status.check_enabled,
        is_trading_day = status.is_trading_day,
        is_trading_time = status.is_trading_time,
        "trading calendar ready"
    );

    // 4. 每只启用的股票一条流水线
    let registry = Arc::new(MonitorRegistry::new());
    for instrument in config.enabled_instruments() {
        info!(
            code = %instrument.code,
            name = %instrument.name,
            interval_secs = instrument.scan_interval.as_secs(),
            min_confidence = instrument.min_confidence,
            "monitoring instrument"
        );
        let pipeline = AnalysisPipeline::new(PipelineParams {
            instrument,
            notify_enabled: config.notification.enabled,
            calendar: calendar.clone(),
            market: market.clone(),
            reasoning: reasoning.clone(),
            notifier: notifier.clone(),
            clock: clock.clone(),
        });
        registry.register(pipeline)?;
    }

    // 5. 管理接口与调度
    let state = AppState {
        registry: registry.clone(),
        calendar,
        clock,
    };
    let bind_addr = format!("{}:{}", config.server.host, config.server.port);
    tokio::spawn(async move {
        if let Err(e) = start_server(state, &bind_addr).await {
            error!("API server error: {}", e);
        }
    });

    let started = registry.start_all();
    info!(started, "all monitors started, press Ctrl+C to stop");

    // 6. 等待退出信号
    tokio::signal::ctrl_c().await?;
    info!("Shutdown signal received, stopping all monitors...");
    registry.stop_all();

    Ok(())
}
