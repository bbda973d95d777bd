use crate::analysis::entity::{AnalysisResult, IndicatorSet, Signal};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// # Summary
/// 推送到通知渠道的交易信号载荷。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradingSignal {
    pub stock_code: String,
    pub stock_name: String,
    pub signal: Signal,
    // 当前价格 (元)
    pub price: f64,
    pub confidence: u8,
    pub reasoning: String,
    pub target_price: f64,
    pub stop_loss: f64,
    pub risk_reward: String,
    pub timestamp: DateTime<Utc>,
    pub indicators: IndicatorSet,
}

impl From<&AnalysisResult> for TradingSignal {
    fn from(r: &AnalysisResult) -> Self {
        Self {
            stock_code: r.code.clone(),
            stock_name: r.name.clone(),
            signal: r.decision.signal,
            price: r.current_price,
            confidence: r.decision.confidence,
            reasoning: r.decision.reasoning.clone(),
            target_price: r.decision.target_price,
            stop_loss: r.decision.stop_loss,
            risk_reward: r.decision.risk_reward.clone(),
            timestamp: r.timestamp,
            indicators: r.indicators.clone(),
        }
    }
}
