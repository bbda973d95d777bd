//! # API 服务启动器
//!
//! 组装 axum 路由、挂载 Swagger UI、配置 CORS 并绑定 TCP 端口对外提供服务。
//! 本模块不直接启动 `main()`, 而是由 `crates/app` 持有并调用。

use std::sync::Arc;

use axum::Router;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;
use utoipa_axum::routes;
use utoipa_swagger_ui::SwaggerUi;

use kanshi_core::common::time::TimeProvider;
use kanshi_engine::calendar::TradingCalendar;
use kanshi_manager::monitor::MonitorRegistry;

use crate::routes::{stock, system};

// ============================================================
//  共享应用状态
// ============================================================

/// 全局应用状态，通过 axum 的 `State` 提取器注入到每个 Handler 中。
///
/// # Invariants
/// - 各字段在服务启动前由 `crates/app` 注入，生命周期与进程等同。
#[derive(Clone)]
pub struct AppState {
    /// 监控任务注册表
    pub registry: Arc<MonitorRegistry>,
    /// 交易日历 (用于交易时间状态查询)
    pub calendar: Arc<TradingCalendar>,
    /// 时钟
    pub clock: Arc<dyn TimeProvider>,
}

// ============================================================
//  OpenAPI 文档定义
// ============================================================

/// 全局 OpenAPI 文档结构
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Kanshi 股票监控 API",
        version = "0.1.0",
        description = "AI 股票监控服务的管理接口。提供标的状态、分析结果、手动分析与运行统计查询。"
    ),
    tags(
        (name = "标的 (Stock)", description = "监控标的、分析结果与手动分析"),
        (name = "系统 (System)", description = "健康检查、运行统计与交易时间")
    )
)]
pub struct ApiDoc;

// ============================================================
//  服务构建与启动
// ============================================================

/// # Summary
/// 构建完整的 axum 应用路由树。
///
/// # Logic
/// 1. 注册所有路由并收集 OpenAPI 文档。
/// 2. 挂载 Swagger UI 与 OpenAPI JSON。
/// 3. 应用宽松 CORS (管理接口仅在内网使用)。
pub fn build_router(state: AppState) -> Router {
    let (router, api) = OpenApiRouter::with_openapi(ApiDoc::openapi())
        .routes(routes!(system::health))
        .routes(routes!(system::statistics))
        .routes(routes!(system::trading_time))
        .routes(routes!(stock::list_stocks))
        .routes(routes!(stock::get_latest))
        .routes(routes!(stock::get_history))
        .routes(routes!(stock::analyze))
        .with_state(state)
        .split_for_parts();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    router
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", api))
        .layer(cors)
}

/// 在已绑定的监听器上提供服务，直到连接出错。
pub async fn serve(listener: TcpListener, state: AppState) -> std::io::Result<()> {
    axum::serve(listener, build_router(state)).await
}

/// # Summary
/// 绑定地址并启动 HTTP 监听。
///
/// # Arguments
/// * `state` - 由外部注入的共享状态
/// * `bind_addr` - 监听的地址与端口，如 `"0.0.0.0:9090"`
pub async fn start_server(state: AppState, bind_addr: &str) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("Kanshi API server listening on {}", bind_addr);
    tracing::info!("Swagger UI: http://{}/swagger-ui/", bind_addr);
    serve(listener, state).await
}
