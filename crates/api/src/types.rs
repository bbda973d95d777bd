//! # DTO (Data Transfer Object) 层
//!
//! 将注册表与流水线的内部状态转化为面向前端 JSON 输出的轻量结构体。
//! 所有 DTO 必须派生 `utoipa::ToSchema` 以自动进入 Swagger 文档。

use chrono::{DateTime, Utc};
use kanshi_core::analysis::entity::AnalysisResult;
use kanshi_engine::pipeline::{CycleOutcome, Dispatch};
use kanshi_manager::monitor::{
    InstrumentStatistics, MonitorTask, RegistryStatistics, StatsSnapshot, TaskState,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

// ============================================================
//  系统 DTO
// ============================================================

/// 健康检查响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
    /// 服务器当前时间 (UTC)
    pub server_time: DateTime<Utc>,
    /// 已注册标的数量
    #[schema(example = 3)]
    pub instruments: usize,
}

// ============================================================
//  标的 DTO
// ============================================================

/// 监控标的 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StockResponse {
    /// 证券代码
    #[schema(example = "600000")]
    pub code: String,
    /// 显示名称
    #[schema(example = "浦发银行")]
    pub name: String,
    /// 扫描间隔 (秒)
    #[schema(example = 300)]
    pub scan_interval_secs: u64,
    /// 通知的最小信心度
    #[schema(example = 70)]
    pub min_confidence: u8,
    /// 任务状态 (idle / running / cancelled)
    #[schema(example = "running")]
    pub state: String,
    pub is_running: bool,
}

fn state_name(state: TaskState) -> String {
    match state {
        TaskState::Idle => "idle",
        TaskState::Running => "running",
        TaskState::Cancelled => "cancelled",
    }
    .to_string()
}

impl From<&MonitorTask> for StockResponse {
    fn from(task: &MonitorTask) -> Self {
        let instrument = task.instrument();
        Self {
            code: instrument.code.clone(),
            name: instrument.name.clone(),
            scan_interval_secs: instrument.scan_interval.as_secs(),
            min_confidence: instrument.min_confidence,
            state: state_name(task.state()),
            is_running: task.is_running(),
        }
    }
}

/// 历史查询参数
#[derive(Debug, Deserialize, ToSchema)]
pub struct HistoryQuery {
    pub limit: Option<usize>,
}

/// 手动分析的结果类别
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzeOutcome {
    // 周期完成，携带分析结果
    Completed,
    // 非交易时段，未执行
    Skipped,
    // 行情或推理失败
    Failed,
}

/// 手动触发分析的响应
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AnalyzeResponse {
    pub outcome: AnalyzeOutcome,
    /// 完成时的分析结果
    pub result: Option<AnalysisResult>,
    /// 跳过时的下一交易时刻
    pub next_trading_time: Option<DateTime<Utc>>,
    /// 通知分发情况 (not_eligible / sent / failed: ...)
    pub notification: Option<String>,
    /// 失败原因
    pub error: Option<String>,
}

impl AnalyzeResponse {
    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            outcome: AnalyzeOutcome::Failed,
            result: None,
            next_trading_time: None,
            notification: None,
            error: Some(error.into()),
        }
    }
}

impl From<CycleOutcome> for AnalyzeResponse {
    fn from(outcome: CycleOutcome) -> Self {
        match outcome {
            CycleOutcome::Skipped { next_trading_time } => Self {
                outcome: AnalyzeOutcome::Skipped,
                result: None,
                next_trading_time: Some(next_trading_time),
                notification: None,
                error: None,
            },
            CycleOutcome::Completed { result, dispatch } => Self {
                outcome: AnalyzeOutcome::Completed,
                result: Some(result),
                next_trading_time: None,
                notification: Some(match dispatch {
                    Dispatch::NotEligible => "not_eligible".to_string(),
                    Dispatch::Sent => "sent".to_string(),
                    Dispatch::Failed(e) => format!("failed: {}", e),
                }),
                error: None,
            },
        }
    }
}

// ============================================================
//  统计 DTO
// ============================================================

/// 运行统计 DTO
#[derive(Debug, Clone, Default, Serialize, Deserialize, ToSchema)]
pub struct StatsResponse {
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub cycles_failed: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl From<StatsSnapshot> for StatsResponse {
    fn from(s: StatsSnapshot) -> Self {
        Self {
            cycles_started: s.cycles_started,
            cycles_completed: s.cycles_completed,
            cycles_skipped: s.cycles_skipped,
            cycles_failed: s.cycles_failed,
            notifications_sent: s.notifications_sent,
            notifications_failed: s.notifications_failed,
            last_run: s.last_run,
            last_error: s.last_error,
        }
    }
}

/// 单个标的的统计 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct InstrumentStatsResponse {
    #[schema(example = "600000")]
    pub code: String,
    pub name: String,
    pub state: String,
    pub stats: StatsResponse,
}

impl From<InstrumentStatistics> for InstrumentStatsResponse {
    fn from(s: InstrumentStatistics) -> Self {
        Self {
            code: s.code,
            name: s.name,
            state: state_name(s.state),
            stats: s.stats.into(),
        }
    }
}

/// 汇总统计 DTO
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct StatisticsResponse {
    pub total_instruments: usize,
    pub running_instruments: usize,
    pub totals: StatsResponse,
    pub per_instrument: Vec<InstrumentStatsResponse>,
}

impl From<RegistryStatistics> for StatisticsResponse {
    fn from(s: RegistryStatistics) -> Self {
        Self {
            total_instruments: s.total_instruments,
            running_instruments: s.running_instruments,
            totals: s.totals.into(),
            per_instrument: s.per_instrument.into_iter().map(Into::into).collect(),
        }
    }
}

// ============================================================
//  通用响应 DTO
// ============================================================

/// 统一 API 响应包装器
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiResponse<T: Serialize + ToSchema> {
    /// 是否成功
    pub success: bool,
    /// 数据载荷 (成功时，可能为空)
    pub data: Option<T>,
    /// 错误信息 (失败时)
    pub error: Option<String>,
}

impl<T: Serialize + ToSchema> ApiResponse<T> {
    /// 构建成功响应
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// 构建无载荷的成功响应 (`data: null`)
    pub fn empty() -> Self {
        Self {
            success: true,
            data: None,
            error: None,
        }
    }
}

/// 构建失败响应 (不含泛型载荷)
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiErrorResponse {
    /// 固定为 false
    pub success: bool,
    /// 错误描述信息
    pub error: String,
}

impl ApiErrorResponse {
    /// 从错误信息构建
    pub fn from_msg(msg: impl Into<String>) -> Self {
        Self {
            success: false,
            error: msg.into(),
        }
    }
}
