//! # 测试替身
//!
//! 供各 crate 集成测试使用的内存协作者，仅在 `test-utils` feature 下编译。

use crate::common::{Adjust, KlineKind};
use crate::market::entity::{Candle, PriceLevel, Quote, SearchHit, Tick};
use crate::market::error::MarketError;
use crate::market::port::MarketDataSource;
use crate::notify::entity::TradingSignal;
use crate::notify::error::NotifyError;
use crate::notify::port::Notifier;
use crate::reasoning::error::ReasoningError;
use crate::reasoning::port::ReasoningService;
use async_trait::async_trait;
use chrono::{Duration, NaiveDate, TimeZone, Utc};
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::Mutex;

/// 生成 `n` 根按日升序的 K 线，收盘价从 `start_li` 开始每根递增 `step_li` 厘。
pub fn ascending_candles(n: usize, start_li: i64, step_li: i64) -> Vec<Candle> {
    let base = Utc
        .with_ymd_and_hms(2025, 1, 1, 7, 0, 0)
        .single()
        .unwrap_or_else(Utc::now);
    let mut close = start_li;
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let offset = i64::try_from(i).unwrap_or(i64::MAX);
        out.push(Candle {
            time: base + Duration::days(offset),
            open: close,
            high: close + 10,
            low: close - 10,
            close,
            volume: 1_000,
            amount: 1_000.0 * 100.0 * 10.0,
        });
        close += step_li;
    }
    out
}

/// 以 `last_li` 为最新价构造一份带五档盘口的行情快照。
pub fn sample_quote(code: &str, last_li: i64) -> Quote {
    let bids = (1..=5)
        .map(|i| PriceLevel { price: last_li - 10 * i, size: 200 * i })
        .collect();
    let asks = (1..=5)
        .map(|i| PriceLevel { price: last_li + 10 * i, size: 100 * i })
        .collect();
    Quote {
        code: code.to_string(),
        prev_close: last_li - 100,
        open: last_li - 50,
        high: last_li + 80,
        low: last_li - 120,
        last: last_li,
        total_hands: 12_345,
        amount: 123_450_000_000.0,
        inner: 4_000,
        outer: 6_000,
        bids,
        asks,
    }
}

/// # Summary
/// 返回固定数据的行情源。
pub struct StaticMarketSource {
    pub quote: Quote,
    pub daily: Vec<Candle>,
    pub intraday: Vec<Candle>,
    // None 表示分时接口失败 (例如非交易时段)
    pub ticks: Option<Vec<Tick>>,
    // 为 true 时 get_quote 返回网络错误
    pub fail_quote: bool,
    pub quote_calls: AtomicUsize,
}

impl StaticMarketSource {
    pub fn new(quote: Quote, daily: Vec<Candle>) -> Self {
        Self {
            quote,
            intraday: ascending_candles(100, 9_900, 1),
            daily,
            ticks: None,
            fail_quote: false,
            quote_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl MarketDataSource for StaticMarketSource {
    async fn get_quote(&self, _code: &str) -> Result<Quote, MarketError> {
        self.quote_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_quote {
            return Err(MarketError::Network("connection refused".to_string()));
        }
        Ok(self.quote.clone())
    }

    async fn get_candles(
        &self,
        _code: &str,
        kind: KlineKind,
        limit: usize,
        _adjust: Adjust,
    ) -> Result<Vec<Candle>, MarketError> {
        let series = match kind {
            KlineKind::Day => &self.daily,
            _ => &self.intraday,
        };
        let skip = series.len().saturating_sub(limit);
        Ok(series[skip..].to_vec())
    }

    async fn get_ticks(
        &self,
        _code: &str,
        _date: Option<NaiveDate>,
    ) -> Result<Vec<Tick>, MarketError> {
        self.ticks.clone().ok_or(MarketError::NotFound)
    }

    async fn search(&self, keyword: &str) -> Result<Vec<SearchHit>, MarketError> {
        Ok(vec![SearchHit {
            code: self.quote.code.clone(),
            name: keyword.to_string(),
        }])
    }
}

/// # Summary
/// 返回预设文本的推理服务，并记录收到的提示词。
pub struct ScriptedReasoning {
    response: Result<String, String>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedReasoning {
    pub fn replying(text: impl Into<String>) -> Self {
        Self {
            response: Ok(text.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(msg: impl Into<String>) -> Self {
        Self {
            response: Err(msg.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ReasoningService for ScriptedReasoning {
    async fn complete(&self, _system: &str, prompt: &str) -> Result<String, ReasoningError> {
        self.prompts.lock().await.push(prompt.to_string());
        self.response
            .clone()
            .map_err(ReasoningError::Network)
    }
}

/// # Summary
/// 记录所有发送请求的通知器，可配置为总是失败。
#[derive(Default)]
pub struct RecordingNotifier {
    pub signals: Mutex<Vec<TradingSignal>>,
    pub messages: Mutex<Vec<String>>,
    pub fail: bool,
}

impl RecordingNotifier {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub async fn signal_count(&self) -> usize {
        self.signals.lock().await.len()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn send_signal(&self, signal: &TradingSignal) -> Result<(), NotifyError> {
        self.signals.lock().await.push(signal.clone());
        if self.fail {
            return Err(NotifyError::Network("webhook unreachable".to_string()));
        }
        Ok(())
    }

    async fn send_message(&self, message: &str) -> Result<(), NotifyError> {
        self.messages.lock().await.push(message.to_string());
        if self.fail {
            return Err(NotifyError::Network("webhook unreachable".to_string()));
        }
        Ok(())
    }
}
