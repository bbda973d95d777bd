use crate::history::HistoryBuffer;
use chrono::{DateTime, Utc};
use kanshi_core::analysis::entity::AnalysisResult;
use kanshi_core::analysis::error::AnalysisError;
use kanshi_core::common::Instrument;
use kanshi_engine::calendar::TradingCalendar;
use kanshi_engine::pipeline::{AnalysisPipeline, CycleOutcome, Dispatch};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch;
use tokio::time::MissedTickBehavior;
use tracing::{error, info, warn};

/// 每个标的保留的默认历史结果条数
pub const DEFAULT_HISTORY_CAPACITY: usize = 50;
/// 调度周期下限，防止零间隔导致空转
const MIN_SCAN_INTERVAL: Duration = Duration::from_secs(1);

/// # Summary
/// Manager 层的统一错误类型。
#[derive(Error, Debug)]
pub enum ManagerError {
    #[error("Instrument not found: {0}")]
    NotFound(String),
    #[error("Instrument already registered: {0}")]
    AlreadyRegistered(String),
    #[error("Analysis error: {0}")]
    Analysis(#[from] AnalysisError),
}

/// 监控任务的生命周期状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    // 已注册，尚未启动调度
    Idle,
    Running,
    // 已收到停止信号并退出调度循环
    Cancelled,
}

/// # Summary
/// 单个标的的运行统计，全部为无锁计数器。
#[derive(Debug, Default)]
pub struct RunStats {
    cycles_started: AtomicU64,
    cycles_completed: AtomicU64,
    cycles_skipped: AtomicU64,
    cycles_failed: AtomicU64,
    notifications_sent: AtomicU64,
    notifications_failed: AtomicU64,
    last_run: Mutex<Option<DateTime<Utc>>>,
    last_error: Mutex<Option<String>>,
}

/// 运行统计的只读快照
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StatsSnapshot {
    pub cycles_started: u64,
    pub cycles_completed: u64,
    pub cycles_skipped: u64,
    pub cycles_failed: u64,
    pub notifications_sent: u64,
    pub notifications_failed: u64,
    pub last_run: Option<DateTime<Utc>>,
    pub last_error: Option<String>,
}

impl StatsSnapshot {
    fn accumulate(&mut self, other: &StatsSnapshot) {
        self.cycles_started += other.cycles_started;
        self.cycles_completed += other.cycles_completed;
        self.cycles_skipped += other.cycles_skipped;
        self.cycles_failed += other.cycles_failed;
        self.notifications_sent += other.notifications_sent;
        self.notifications_failed += other.notifications_failed;
        if other.last_run > self.last_run {
            self.last_run = other.last_run;
        }
    }
}

impl RunStats {
    fn record_start(&self, at: DateTime<Utc>) {
        self.cycles_started.fetch_add(1, Ordering::Relaxed);
        *self.last_run.lock().unwrap_or_else(|e| e.into_inner()) = Some(at);
    }

    fn record_outcome(&self, outcome: &CycleOutcome) {
        match outcome {
            CycleOutcome::Skipped { .. } => {
                self.cycles_skipped.fetch_add(1, Ordering::Relaxed);
            }
            CycleOutcome::Completed { dispatch, .. } => {
                self.cycles_completed.fetch_add(1, Ordering::Relaxed);
                match dispatch {
                    Dispatch::Sent => {
                        self.notifications_sent.fetch_add(1, Ordering::Relaxed);
                    }
                    Dispatch::Failed(_) => {
                        self.notifications_failed.fetch_add(1, Ordering::Relaxed);
                    }
                    Dispatch::NotEligible => {}
                }
            }
        }
    }

    fn record_failure(&self, err: &AnalysisError) {
        self.cycles_failed.fetch_add(1, Ordering::Relaxed);
        *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = Some(err.to_string());
    }

    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            cycles_started: self.cycles_started.load(Ordering::Relaxed),
            cycles_completed: self.cycles_completed.load(Ordering::Relaxed),
            cycles_skipped: self.cycles_skipped.load(Ordering::Relaxed),
            cycles_failed: self.cycles_failed.load(Ordering::Relaxed),
            notifications_sent: self.notifications_sent.load(Ordering::Relaxed),
            notifications_failed: self.notifications_failed.load(Ordering::Relaxed),
            last_run: *self.last_run.lock().unwrap_or_else(|e| e.into_inner()),
            last_error: self
                .last_error
                .lock()
                .unwrap_or_else(|e| e.into_inner())
                .clone(),
        }
    }
}

/// # Summary
/// 单个标的的监控任务：流水线、周期互斥锁、结果历史与运行统计。
///
/// # Invariants
/// - 同一标的的调度周期与手动触发通过 `cycle_lock` 串行执行，不会重叠。
/// - 任务体从不访问注册表。
pub struct MonitorTask {
    pipeline: AnalysisPipeline,
    cycle_lock: tokio::sync::Mutex<()>,
    history: Mutex<HistoryBuffer<AnalysisResult>>,
    stats: RunStats,
    state: RwLock<TaskState>,
}

impl MonitorTask {
    fn new(pipeline: AnalysisPipeline, history_capacity: usize) -> Self {
        Self {
            pipeline,
            cycle_lock: tokio::sync::Mutex::new(()),
            history: Mutex::new(HistoryBuffer::new(history_capacity)),
            stats: RunStats::default(),
            state: RwLock::new(TaskState::Idle),
        }
    }

    pub fn instrument(&self) -> &Instrument {
        self.pipeline.instrument()
    }

    pub fn calendar(&self) -> &TradingCalendar {
        self.pipeline.calendar()
    }

    pub fn state(&self) -> TaskState {
        *self.state.read().unwrap_or_else(|e| e.into_inner())
    }

    fn set_state(&self, state: TaskState) {
        *self.state.write().unwrap_or_else(|e| e.into_inner()) = state;
    }

    pub fn is_running(&self) -> bool {
        self.state() == TaskState::Running
    }

    /// 最近一次完成的分析结果
    pub fn latest(&self) -> Option<AnalysisResult> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).last()
    }

    /// 由新到旧的最近 `limit` 条结果
    pub fn history(&self, limit: usize) -> Vec<AnalysisResult> {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .recent(limit)
    }

    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// # Summary
    /// 执行一次分析周期并记录统计与历史。
    ///
    /// # Logic
    /// 1. 获取周期互斥锁，等待同一标的正在进行的周期结束。
    /// 2. 执行流水线。
    /// 3. 完成的结果写入历史；失败记录到统计并原样返回。
    pub async fn run_once(&self) -> Result<CycleOutcome, AnalysisError> {
        let _guard = self.cycle_lock.lock().await;
        self.stats.record_start(self.pipeline.now());

        match self.pipeline.run_cycle().await {
            Ok(outcome) => {
                self.stats.record_outcome(&outcome);
                if let CycleOutcome::Completed { result, .. } = &outcome {
                    self.history
                        .lock()
                        .unwrap_or_else(|e| e.into_inner())
                        .push(result.clone());
                }
                Ok(outcome)
            }
            Err(e) => {
                error!(code = %self.instrument().code, "analysis cycle failed: {}", e);
                self.stats.record_failure(&e);
                Err(e)
            }
        }
    }
}

/// 注册表中的一项：任务与其取消信号
struct TaskEntry {
    task: Arc<MonitorTask>,
    cancel: watch::Sender<bool>,
}

/// 注册表级的汇总统计
#[derive(Debug, Clone, Serialize)]
pub struct RegistryStatistics {
    pub total_instruments: usize,
    pub running_instruments: usize,
    pub totals: StatsSnapshot,
    pub per_instrument: Vec<InstrumentStatistics>,
}

#[derive(Debug, Clone, Serialize)]
pub struct InstrumentStatistics {
    pub code: String,
    pub name: String,
    pub state: TaskState,
    pub stats: StatsSnapshot,
}

/// # Summary
/// 监控任务注册表与调度器。
///
/// # Invariants
/// - 任务表由一把读写锁保护，写操作只发生在启动阶段的注册。
/// - 每个任务拥有独立的取消信号，取消只在调度间隔边界被检查。
pub struct MonitorRegistry {
    tasks: RwLock<HashMap<String, TaskEntry>>,
    history_capacity: usize,
}

impl Default for MonitorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl MonitorRegistry {
    pub fn new() -> Self {
        Self::with_history_capacity(DEFAULT_HISTORY_CAPACITY)
    }

    pub fn with_history_capacity(history_capacity: usize) -> Self {
        Self {
            tasks: RwLock::new(HashMap::new()),
            history_capacity,
        }
    }

    /// # Summary
    /// 注册一个标的的分析流水线。
    ///
    /// # Returns
    /// * 证券代码已存在时返回 `AlreadyRegistered`。
    pub fn register(&self, pipeline: AnalysisPipeline) -> Result<Arc<MonitorTask>, ManagerError> {
        let code = pipeline.instrument().code.clone();
        let mut tasks = self.tasks.write().unwrap_or_else(|e| e.into_inner());
        if tasks.contains_key(&code) {
            return Err(ManagerError::AlreadyRegistered(code));
        }

        let task = Arc::new(MonitorTask::new(pipeline, self.history_capacity));
        let (cancel, _) = watch::channel(false);
        tasks.insert(
            code.clone(),
            TaskEntry {
                task: task.clone(),
                cancel,
            },
        );
        info!(code = %code, "instrument registered");
        Ok(task)
    }

    /// # Summary
    /// 为所有空闲任务启动独立的周期调度。
    ///
    /// # Logic
    /// 1. 在读锁下收集尚未启动且未被取消的任务。
    /// 2. 为每个任务 `tokio::spawn` 一个调度循环：立即执行一次，之后每个扫描间隔执行一次。
    ///
    /// # Returns
    /// 本次启动的任务数量。
    pub fn start_all(&self) -> usize {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        let mut started = 0;

        for (code, entry) in tasks.iter() {
            if entry.task.state() != TaskState::Idle || *entry.cancel.borrow() {
                continue;
            }
            entry.task.set_state(TaskState::Running);
            let task = entry.task.clone();
            let cancel = entry.cancel.subscribe();
            info!(
                code = %code,
                interval_secs = task.instrument().scan_interval.as_secs(),
                "monitor schedule started"
            );
            tokio::spawn(run_schedule(task, cancel));
            started += 1;
        }

        started
    }

    /// # Summary
    /// 向所有任务广播取消信号并立即返回，不等待进行中的周期。
    pub fn stop_all(&self) {
        let tasks = self.tasks.read().unwrap_or_else(|e| e.into_inner());
        for (code, entry) in tasks.iter() {
            entry.cancel.send_replace(true);
            info!(code = %code, "stop requested");
        }
    }

    pub fn get_analyzer(&self, code: &str) -> Option<Arc<MonitorTask>> {
        self.tasks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .get(code)
            .map(|entry| entry.task.clone())
    }

    /// 所有任务，按证券代码排序
    pub fn get_all_analyzers(&self) -> Vec<Arc<MonitorTask>> {
        let mut all: Vec<Arc<MonitorTask>> = self
            .tasks
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .values()
            .map(|entry| entry.task.clone())
            .collect();
        all.sort_by(|a, b| a.instrument().code.cmp(&b.instrument().code));
        all
    }

    /// # Summary
    /// 手动触发一次分析周期。
    ///
    /// # Logic
    /// 1. 读锁下查找任务，找到后立即释放锁。
    /// 2. 在任务的周期互斥锁下执行，与调度循环串行。
    pub async fn trigger(&self, code: &str) -> Result<CycleOutcome, ManagerError> {
        let task = self
            .get_analyzer(code)
            .ok_or_else(|| ManagerError::NotFound(code.to_string()))?;
        info!(code = %code, "manual analysis triggered");
        Ok(task.run_once().await?)
    }

    /// 汇总所有任务的运行统计
    pub fn statistics(&self) -> RegistryStatistics {
        let analyzers = self.get_all_analyzers();
        let mut totals = StatsSnapshot::default();
        let mut per_instrument = Vec::with_capacity(analyzers.len());

        for task in &analyzers {
            let stats = task.stats();
            totals.accumulate(&stats);
            per_instrument.push(InstrumentStatistics {
                code: task.instrument().code.clone(),
                name: task.instrument().name.clone(),
                state: task.state(),
                stats,
            });
        }

        RegistryStatistics {
            total_instruments: analyzers.len(),
            running_instruments: analyzers.iter().filter(|t| t.is_running()).count(),
            totals,
            per_instrument,
        }
    }
}

/// # Summary
/// 单个标的的调度循环。
///
/// # Logic
/// 1. 首个 tick 立即触发，之后按扫描间隔触发；错过的 tick 顺延而不补发。
/// 2. 每个 tick 前检查取消信号，进行中的周期总会执行完毕。
/// 3. 周期失败只记录，不影响后续调度。
async fn run_schedule(task: Arc<MonitorTask>, mut cancel: watch::Receiver<bool>) {
    let code = task.instrument().code.clone();
    let period = task.instrument().scan_interval.max(MIN_SCAN_INTERVAL);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        if *cancel.borrow() {
            break;
        }
        tokio::select! {
            biased;
            changed = cancel.changed() => {
                if changed.is_err() || *cancel.borrow() {
                    break;
                }
                continue;
            }
            _ = ticker.tick() => {}
        }

        match task.run_once().await {
            Ok(CycleOutcome::Skipped { next_trading_time }) => {
                info!(
                    code = %code,
                    next = %task.calendar().format_local(next_trading_time),
                    "not trading time, waiting"
                );
            }
            Ok(CycleOutcome::Completed { .. }) => {}
            Err(e) => {
                warn!(code = %code, "cycle aborted, retrying next tick: {}", e);
            }
        }
    }

    task.set_state(TaskState::Cancelled);
    info!(code = %code, "monitor schedule stopped");
}
