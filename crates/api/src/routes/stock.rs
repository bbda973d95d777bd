//! # 标的路由控制器
//!
//! 实现 `/api/stocks` 与 `/api/stock/{code}` 路径下的 REST 接口。

use axum::Json;
use axum::extract::{Path, Query, State};
use kanshi_core::analysis::entity::AnalysisResult;
use kanshi_manager::monitor::ManagerError;

use crate::error::ApiError;
use crate::server::AppState;
use crate::types::{AnalyzeResponse, ApiResponse, HistoryQuery, StockResponse};

/// 历史查询的默认条数
const DEFAULT_HISTORY_LIMIT: usize = 20;

/// 列出所有监控标的及其任务状态
#[utoipa::path(
    get,
    path = "/api/stocks",
    tag = "标的 (Stock)",
    responses(
        (status = 200, description = "标的列表获取成功", body = ApiResponse<Vec<StockResponse>>)
    )
)]
pub async fn list_stocks(State(state): State<AppState>) -> Json<ApiResponse<Vec<StockResponse>>> {
    let stocks = state
        .registry
        .get_all_analyzers()
        .iter()
        .map(|task| StockResponse::from(task.as_ref()))
        .collect();
    Json(ApiResponse::ok(stocks))
}

/// 获取标的最近一次分析结果
///
/// 标的尚未完成任何周期时返回 `data: null`。
#[utoipa::path(
    get,
    path = "/api/stock/{code}/latest",
    tag = "标的 (Stock)",
    params(
        ("code" = String, Path, description = "证券代码")
    ),
    responses(
        (status = 200, description = "获取成功", body = ApiResponse<AnalysisResult>),
        (status = 404, description = "标的未注册")
    )
)]
pub async fn get_latest(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<AnalysisResult>>, ApiError> {
    let task = state
        .registry
        .get_analyzer(&code)
        .ok_or_else(|| ManagerError::NotFound(code.clone()))?;

    Ok(Json(match task.latest() {
        Some(result) => ApiResponse::ok(result),
        None => ApiResponse::empty(),
    }))
}

/// 获取标的最近的分析历史 (由新到旧)
#[utoipa::path(
    get,
    path = "/api/stock/{code}/history",
    tag = "标的 (Stock)",
    params(
        ("code" = String, Path, description = "证券代码"),
        ("limit" = Option<usize>, Query, description = "返回数量限制，默认 20")
    ),
    responses(
        (status = 200, description = "获取成功", body = ApiResponse<Vec<AnalysisResult>>),
        (status = 404, description = "标的未注册")
    )
)]
pub async fn get_history(
    State(state): State<AppState>,
    Path(code): Path<String>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<Vec<AnalysisResult>>>, ApiError> {
    let task = state
        .registry
        .get_analyzer(&code)
        .ok_or_else(|| ManagerError::NotFound(code.clone()))?;

    let limit = query.limit.unwrap_or(DEFAULT_HISTORY_LIMIT);
    Ok(Json(ApiResponse::ok(task.history(limit))))
}

/// 手动触发一次分析
///
/// 与调度周期共用同一把周期锁，若该标的正在分析则等待其结束。
/// 行情或推理失败时仍返回 200，`outcome` 为 `failed`。
#[utoipa::path(
    post,
    path = "/api/stock/{code}/analyze",
    tag = "标的 (Stock)",
    params(
        ("code" = String, Path, description = "证券代码")
    ),
    responses(
        (status = 200, description = "周期已执行", body = ApiResponse<AnalyzeResponse>),
        (status = 404, description = "标的未注册")
    )
)]
pub async fn analyze(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> Result<Json<ApiResponse<AnalyzeResponse>>, ApiError> {
    tracing::info!(code = %code, "manual analysis requested");
    let response = match state.registry.trigger(&code).await {
        Ok(outcome) => AnalyzeResponse::from(outcome),
        Err(ManagerError::Analysis(e)) => AnalyzeResponse::failed(e.to_string()),
        Err(e) => return Err(e.into()),
    };
    Ok(Json(ApiResponse::ok(response)))
}
