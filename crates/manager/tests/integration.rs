use async_trait::async_trait;
use chrono::{DateTime, TimeZone, Utc};
use kanshi_core::analysis::entity::Signal;
use kanshi_core::common::Instrument;
use kanshi_core::common::time::FakeClockProvider;
use kanshi_core::notify::port::Notifier;
use kanshi_core::reasoning::error::ReasoningError;
use kanshi_core::reasoning::port::ReasoningService;
use kanshi_core::test_utils::{
    RecordingNotifier, ScriptedReasoning, StaticMarketSource, ascending_candles, sample_quote,
};
use kanshi_engine::calendar::TradingCalendar;
use kanshi_engine::pipeline::{AnalysisPipeline, CycleOutcome, PipelineParams};
use kanshi_manager::monitor::{ManagerError, MonitorRegistry, TaskState};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::time::{Duration, sleep};

const BUY: &str = "```json\n{\"signal\":\"BUY\",\"confidence\":88,\"reasoning\":\"趋势向上\",\"target_price\":10.8,\"stop_loss\":9.6,\"risk_reward\":\"1:2\"}\n```";

/// 2025-03-10 (周一) 10:00 北京时间
fn trading_moment() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 3, 10, 2, 0, 0)
        .single()
        .unwrap_or_else(Utc::now)
}

fn instrument(code: &str, minutes: u64) -> Instrument {
    Instrument {
        code: code.to_string(),
        name: format!("测试{}", code),
        enabled: true,
        scan_interval: Duration::from_secs(minutes * 60),
        min_confidence: 70,
    }
}

fn pipeline(
    code: &str,
    minutes: u64,
    market: Arc<StaticMarketSource>,
    reasoning: &str,
    notifier: Arc<RecordingNotifier>,
) -> AnalysisPipeline {
    AnalysisPipeline::new(PipelineParams {
        instrument: instrument(code, minutes),
        notify_enabled: true,
        calendar: Arc::new(TradingCalendar::default_a_share()),
        market,
        reasoning: Arc::new(ScriptedReasoning::replying(reasoning)),
        notifier: Some(notifier as Arc<dyn Notifier>),
        clock: Arc::new(FakeClockProvider::new(trading_moment())),
    })
}

fn market(code: &str) -> Arc<StaticMarketSource> {
    Arc::new(StaticMarketSource::new(
        sample_quote(code, 10_000),
        ascending_candles(60, 9_100, 15),
    ))
}

/// # Summary
/// 调度生命周期：立即执行一次，按间隔重复，停止后不再执行。
#[tokio::test(start_paused = true)]
async fn test_schedule_lifecycle() {
    let registry = MonitorRegistry::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let source = market("600000");
    registry
        .register(pipeline("600000", 5, source.clone(), BUY, notifier.clone()))
        .unwrap();

    let task = registry.get_analyzer("600000").unwrap();
    assert_eq!(task.state(), TaskState::Idle);

    assert_eq!(registry.start_all(), 1);
    assert!(task.is_running());
    // 重复启动不会产生第二个调度
    assert_eq!(registry.start_all(), 0);

    // 0, 5, 10 分钟各执行一次
    sleep(Duration::from_secs(11 * 60)).await;
    assert_eq!(task.stats().cycles_completed, 3);
    assert_eq!(source.quote_calls.load(Ordering::SeqCst), 3);
    assert_eq!(notifier.signal_count().await, 3);
    assert_eq!(task.latest().map(|r| r.decision.signal), Some(Signal::Buy));

    registry.stop_all();
    sleep(Duration::from_secs(1)).await;
    assert_eq!(task.state(), TaskState::Cancelled);

    sleep(Duration::from_secs(30 * 60)).await;
    assert_eq!(task.stats().cycles_completed, 3);
    // 已取消的任务不会被重新启动
    assert_eq!(registry.start_all(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_failing_cycles_keep_schedule_alive() {
    let registry = MonitorRegistry::new();
    let mut source = StaticMarketSource::new(sample_quote("000001", 10_000), ascending_candles(60, 9_100, 15));
    source.fail_quote = true;
    registry
        .register(pipeline(
            "000001",
            1,
            Arc::new(source),
            BUY,
            Arc::new(RecordingNotifier::default()),
        ))
        .unwrap();

    registry.start_all();
    sleep(Duration::from_secs(150)).await;

    let task = registry.get_analyzer("000001").unwrap();
    let stats = task.stats();
    assert_eq!(stats.cycles_failed, 3);
    assert_eq!(stats.cycles_completed, 0);
    assert!(stats.last_error.is_some());
    assert!(task.is_running());
    registry.stop_all();
}

#[tokio::test]
async fn test_manual_trigger_records_history() {
    let registry = MonitorRegistry::with_history_capacity(2);
    let notifier = Arc::new(RecordingNotifier::default());
    registry
        .register(pipeline("600000", 5, market("600000"), BUY, notifier.clone()))
        .unwrap();

    for _ in 0..3 {
        let outcome = registry.trigger("600000").await.unwrap();
        assert!(matches!(outcome, CycleOutcome::Completed { .. }));
    }

    let task = registry.get_analyzer("600000").unwrap();
    assert_eq!(task.history(10).len(), 2);
    assert_eq!(task.history(1).len(), 1);
    assert_eq!(task.state(), TaskState::Idle);
    assert_eq!(notifier.signal_count().await, 3);

    let err = registry.trigger("999999").await.unwrap_err();
    assert!(matches!(err, ManagerError::NotFound(_)));
}

#[tokio::test]
async fn test_duplicate_registration_and_statistics() {
    let registry = MonitorRegistry::new();
    let notifier = Arc::new(RecordingNotifier::default());
    registry
        .register(pipeline("600036", 5, market("600036"), BUY, notifier.clone()))
        .unwrap();
    registry
        .register(pipeline("000001", 5, market("000001"), "无法判断", notifier.clone()))
        .unwrap();

    let dup = registry.register(pipeline("600036", 5, market("600036"), BUY, notifier.clone()));
    assert!(matches!(dup, Err(ManagerError::AlreadyRegistered(_))));

    registry.trigger("600036").await.unwrap();
    registry.trigger("000001").await.unwrap();

    let codes: Vec<String> = registry
        .get_all_analyzers()
        .iter()
        .map(|t| t.instrument().code.clone())
        .collect();
    assert_eq!(codes, vec!["000001", "600036"]);

    let stats = registry.statistics();
    assert_eq!(stats.total_instruments, 2);
    assert_eq!(stats.running_instruments, 0);
    assert_eq!(stats.totals.cycles_started, 2);
    assert_eq!(stats.totals.cycles_completed, 2);
    // 只有 BUY 被分发，HOLD 不分发
    assert_eq!(stats.totals.notifications_sent, 1);
    // 统计时间来自流水线时钟而非系统时钟
    assert_eq!(stats.totals.last_run, Some(trading_moment()));
}

/// 每次调用耗时固定的推理服务，记录并发度
#[derive(Default)]
struct SlowReasoning {
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: AtomicUsize,
    finished: AtomicUsize,
}

#[async_trait]
impl ReasoningService for SlowReasoning {
    async fn complete(&self, _system: &str, _prompt: &str) -> Result<String, ReasoningError> {
        self.started.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        sleep(self.delay).await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        self.finished.fetch_add(1, Ordering::SeqCst);
        Ok(BUY.to_string())
    }
}

/// # Summary
/// 周期耗时超过扫描间隔时不会重叠；停止请求立即返回，进行中的周期仍会完成。
///
/// # Logic
/// 1. 扫描间隔 60 秒，每次推理耗时 150 秒：周期分别在 0、150、300 秒开始。
/// 2. 第 400 秒停止，此时第三个周期仍在推理中。
/// 3. 之后不再开始新周期，第三个周期计入完成数。
#[tokio::test(start_paused = true)]
async fn test_slow_cycles_never_overlap_and_finish_after_stop() {
    let reasoning = Arc::new(SlowReasoning {
        delay: Duration::from_secs(150),
        ..SlowReasoning::default()
    });
    let registry = MonitorRegistry::new();
    registry
        .register(AnalysisPipeline::new(PipelineParams {
            instrument: instrument("600000", 1),
            notify_enabled: false,
            calendar: Arc::new(TradingCalendar::default_a_share()),
            market: market("600000"),
            reasoning: reasoning.clone(),
            notifier: None,
            clock: Arc::new(FakeClockProvider::new(trading_moment())),
        }))
        .unwrap();

    registry.start_all();
    sleep(Duration::from_secs(400)).await;

    registry.stop_all();
    // 停止请求不等待进行中的周期
    assert_eq!(reasoning.in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(reasoning.started.load(Ordering::SeqCst), 3);

    sleep(Duration::from_secs(1000)).await;
    let task = registry.get_analyzer("600000").unwrap();
    assert_eq!(reasoning.max_in_flight.load(Ordering::SeqCst), 1);
    assert_eq!(reasoning.started.load(Ordering::SeqCst), 3);
    assert_eq!(reasoning.finished.load(Ordering::SeqCst), 3);
    assert_eq!(task.stats().cycles_completed, 3);
    assert_eq!(task.state(), TaskState::Cancelled);
}
