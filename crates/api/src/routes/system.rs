//! # 系统路由控制器

use axum::Json;
use axum::extract::State;
use kanshi_engine::calendar::CalendarStatus;

use crate::server::AppState;
use crate::types::{ApiResponse, HealthResponse, StatisticsResponse};

/// 健康检查
#[utoipa::path(
    get,
    path = "/health",
    tag = "系统 (System)",
    responses(
        (status = 200, description = "服务正常", body = ApiResponse<HealthResponse>)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::ok(HealthResponse {
        status: "ok".to_string(),
        server_time: state.clock.now(),
        instruments: state.registry.get_all_analyzers().len(),
    }))
}

/// 汇总运行统计
#[utoipa::path(
    get,
    path = "/api/statistics",
    tag = "系统 (System)",
    responses(
        (status = 200, description = "获取成功", body = ApiResponse<StatisticsResponse>)
    )
)]
pub async fn statistics(State(state): State<AppState>) -> Json<ApiResponse<StatisticsResponse>> {
    Json(ApiResponse::ok(state.registry.statistics().into()))
}

/// 交易时间状态
#[utoipa::path(
    get,
    path = "/api/trading-time",
    tag = "系统 (System)",
    responses(
        (status = 200, description = "获取成功", body = ApiResponse<CalendarStatus>)
    )
)]
pub async fn trading_time(State(state): State<AppState>) -> Json<ApiResponse<CalendarStatus>> {
    Json(ApiResponse::ok(state.calendar.status(state.clock.now())))
}
