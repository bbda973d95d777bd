use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

/// # Summary
/// 交易信号方向。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "UPPERCASE")]
pub enum Signal {
    Buy,
    Sell,
    Hold,
}

impl Signal {
    /// 是否为方向性信号 (BUY / SELL)
    pub fn is_directional(&self) -> bool {
        matches!(self, Signal::Buy | Signal::Sell)
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Buy => write!(f, "BUY"),
            Signal::Sell => write!(f, "SELL"),
            Signal::Hold => write!(f, "HOLD"),
        }
    }
}

impl std::str::FromStr for Signal {
    type Err = String;

    /// 大小写与首尾空白不敏感
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_uppercase().as_str() {
            "BUY" => Ok(Signal::Buy),
            "SELL" => Ok(Signal::Sell),
            "HOLD" => Ok(Signal::Hold),
            other => Err(format!("invalid signal: {} (must be BUY/SELL/HOLD)", other)),
        }
    }
}

/// # Summary
/// 从推理服务文本中提取出的结构化交易决策。
///
/// # Invariants
/// - `confidence` 位于 [0, 100]。
/// - `signal == Buy` 时 `target_price > 0` 且 `stop_loss > 0`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Decision {
    pub signal: Signal,
    pub confidence: u8,
    pub reasoning: String,
    pub target_price: f64,
    pub stop_loss: f64,
    pub risk_reward: String,
}

/// # Summary
/// 技术指标集合。
///
/// # Invariants
/// - 历史数据不足时对应字段为 None，缺失不是错误。
/// - 价格字段均为元，成交量为股。
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize, ToSchema)]
pub struct IndicatorSet {
    pub current_price: f64,
    pub open_price: f64,
    pub high_price: f64,
    pub low_price: f64,
    pub prev_close: f64,
    // 相对昨收的涨跌幅 (%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub change_percent: Option<f64>,
    // 成交量 (股)
    pub volume: i64,
    // 成交额 (元)
    pub amount: f64,
    // 外盘占内外盘总和的比例 (%)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outer_ratio: Option<f64>,
    // 买五档挂单总量 / 卖五档挂单总量
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buy_sell_ratio: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma5: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma10: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma20: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ma60: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rsi14: Option<f64>,
    // 近 20 日收益率标准差 (小数，非百分比)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub volatility_20d: Option<f64>,
}

/// # Summary
/// 单次分析周期的完整结果。
///
/// # Invariants
/// - 每个完成的周期创建一次，创建后不可变。
/// - 核心层不做持久化。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct AnalysisResult {
    pub code: String,
    pub name: String,
    // 分析参考价 (元)
    pub current_price: f64,
    pub decision: Decision,
    pub indicators: IndicatorSet,
    pub timestamp: DateTime<Utc>,
}
