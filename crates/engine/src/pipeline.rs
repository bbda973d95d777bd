use crate::calendar::TradingCalendar;
use crate::decision;
use crate::indicator;
use crate::prompt::{self, PromptContext};
use chrono::{DateTime, Utc};
use kanshi_core::analysis::entity::AnalysisResult;
use kanshi_core::analysis::error::AnalysisError;
use kanshi_core::common::time::TimeProvider;
use kanshi_core::common::{Adjust, Instrument, KlineKind};
use kanshi_core::market::entity::li_to_yuan;
use kanshi_core::market::port::MarketDataSource;
use kanshi_core::notify::entity::TradingSignal;
use kanshi_core::notify::port::Notifier;
use kanshi_core::reasoning::port::ReasoningService;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// 日 K 线请求根数
pub const DAILY_CANDLES: usize = 60;
/// 30 分钟 K 线请求根数
pub const INTRADAY_CANDLES: usize = 100;

/// # Summary
/// 构建分析流水线所需的参数。
///
/// # Invariants
/// - 所有外部协作者通过 `Arc<dyn Trait>` 注入，同一实例可被多个标的共享。
pub struct PipelineParams {
    pub instrument: Instrument,
    // 全局通知开关
    pub notify_enabled: bool,
    pub calendar: Arc<TradingCalendar>,
    pub market: Arc<dyn MarketDataSource>,
    pub reasoning: Arc<dyn ReasoningService>,
    // 未配置任何渠道时为 None
    pub notifier: Option<Arc<dyn Notifier>>,
    pub clock: Arc<dyn TimeProvider>,
}

/// 通知分发的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Dispatch {
    // 未满足分发条件 (开关关闭、HOLD 或信心度不足)
    NotEligible,
    Sent,
    // 分发失败，仅记录
    Failed(String),
}

/// 单个周期的结果
#[derive(Debug, Clone)]
pub enum CycleOutcome {
    // 非交易时段，周期未执行
    Skipped { next_trading_time: DateTime<Utc> },
    Completed {
        result: AnalysisResult,
        dispatch: Dispatch,
    },
}

/// # Summary
/// 单个标的的分析流水线。
///
/// # Invariants
/// - 周期之间不共享可变状态，`run_cycle` 只需 `&self`。
/// - 不持有任何锁；同一标的的周期串行由调度方保证。
pub struct AnalysisPipeline {
    instrument: Instrument,
    notify_enabled: bool,
    calendar: Arc<TradingCalendar>,
    market: Arc<dyn MarketDataSource>,
    reasoning: Arc<dyn ReasoningService>,
    notifier: Option<Arc<dyn Notifier>>,
    clock: Arc<dyn TimeProvider>,
}

impl AnalysisPipeline {
    pub fn new(params: PipelineParams) -> Self {
        Self {
            instrument: params.instrument,
            notify_enabled: params.notify_enabled,
            calendar: params.calendar,
            market: params.market,
            reasoning: params.reasoning,
            notifier: params.notifier,
            clock: params.clock,
        }
    }

    pub fn instrument(&self) -> &Instrument {
        &self.instrument
    }

    pub fn calendar(&self) -> &TradingCalendar {
        &self.calendar
    }

    /// 流水线时钟的当前时间
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// # Summary
    /// 执行一个完整的分析周期。
    ///
    /// # Logic
    /// 1. 交易时段闸门，非交易时段直接返回 `Skipped`。
    /// 2. 获取行情快照、60 根日 K 与 100 根 30 分钟 K，任一失败终止周期。
    /// 3. 尽力获取分时成交，失败时忽略。
    /// 4. 计算指标并渲染提示词。
    /// 5. 调用推理服务，失败终止周期。
    /// 6. 解析并校验决策，失败时合成 HOLD 决策。
    /// 7. 组装结果并按条件分发通知，分发失败不影响周期结果。
    ///
    /// # Returns
    /// * 行情或推理服务失败时返回 `AnalysisError`。
    pub async fn run_cycle(&self) -> Result<CycleOutcome, AnalysisError> {
        let code = self.instrument.code.as_str();
        let now = self.clock.now();

        if !self.calendar.is_trading_time(now) {
            let next = self.calendar.next_trading_time(now);
            debug!(
                code,
                next = %self.calendar.format_local(next),
                "outside trading hours, cycle skipped"
            );
            return Ok(CycleOutcome::Skipped {
                next_trading_time: next,
            });
        }

        let quote = self.market.get_quote(code).await?;
        let daily = self
            .market
            .get_candles(code, KlineKind::Day, DAILY_CANDLES, Adjust::None)
            .await?;
        let intraday = self
            .market
            .get_candles(code, KlineKind::Minute30, INTRADAY_CANDLES, Adjust::None)
            .await?;

        let ticks = match self.market.get_ticks(code, None).await {
            Ok(ticks) => Some(ticks),
            Err(e) => {
                warn!(code, "tick data unavailable: {}", e);
                None
            }
        };

        let indicators = indicator::compute(&quote, &daily);

        let rendered = prompt::render(&PromptContext {
            instrument: &self.instrument,
            quote: &quote,
            indicators: &indicators,
            daily: &daily,
            intraday_len: intraday.len(),
            ticks: ticks.as_deref(),
            analyzed_at: self.calendar.format_local(now),
        });
        debug!(code, prompt = %rendered, "analysis prompt rendered");

        let response = self.reasoning.complete(prompt::SYSTEM_ROLE, &rendered).await?;
        debug!(code, response = %response, "reasoning response received");

        let current_price = li_to_yuan(quote.last);
        let decision = match decision::parse(&response) {
            Ok(mut d) => {
                let warnings = decision::validate(&d, current_price);
                decision::append_warnings(&mut d, &warnings);
                d
            }
            Err(e) => {
                warn!(code, "unusable decision, falling back to HOLD: {}", e);
                decision::fallback_hold(&response)
            }
        };

        let result = AnalysisResult {
            code: self.instrument.code.clone(),
            name: self.instrument.name.clone(),
            current_price,
            decision,
            indicators,
            timestamp: self.clock.now(),
        };

        info!(
            code,
            signal = %result.decision.signal,
            confidence = result.decision.confidence,
            price = result.current_price,
            "analysis completed"
        );

        let dispatch = self.dispatch(&result).await;
        Ok(CycleOutcome::Completed { result, dispatch })
    }

    /// 是否满足通知条件: 开关开启、渠道存在、方向性信号且信心度达标
    fn eligible(&self, result: &AnalysisResult) -> bool {
        self.notify_enabled
            && self.notifier.is_some()
            && result.decision.signal.is_directional()
            && result.decision.confidence >= self.instrument.min_confidence
    }

    async fn dispatch(&self, result: &AnalysisResult) -> Dispatch {
        let notifier = match &self.notifier {
            Some(n) if self.eligible(result) => n,
            _ => return Dispatch::NotEligible,
        };

        let signal = TradingSignal::from(result);
        match notifier.send_signal(&signal).await {
            Ok(()) => {
                info!(code = %result.code, signal = %signal.signal, "signal notification sent");
                Dispatch::Sent
            }
            Err(e) => {
                warn!(code = %result.code, "signal notification failed: {}", e);
                Dispatch::Failed(e.to_string())
            }
        }
    }
}
