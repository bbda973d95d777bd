use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 1 元 = 1000 厘
const LI_PER_YUAN: f64 = 1000.0;
/// 1 手 = 100 股
const SHARES_PER_HAND: i64 = 100;

/// # Summary
/// 将行情网关的最小价格单位 (厘) 换算为元。
#[allow(clippy::cast_precision_loss)] // 厘单位的价格远小于 2^53
pub fn li_to_yuan(li: i64) -> f64 {
    li as f64 / LI_PER_YUAN
}

/// 将成交量 (手) 换算为股。
pub fn hands_to_shares(hands: i64) -> i64 {
    hands.saturating_mul(SHARES_PER_HAND)
}

/// 将成交额 (厘) 换算为元。
pub fn amount_to_yuan(amount: f64) -> f64 {
    amount / LI_PER_YUAN
}

/// # Summary
/// 单根 K 线数据实体，记录特定时段内的行情波动。
///
/// # Invariants
/// - 价格字段以厘为单位，与行情网关保持一致。
/// - `high` 必须大于或等于 `low`, `open`, `close`。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    // K 线时间
    pub time: DateTime<Utc>,
    // 开盘价 (厘)
    pub open: i64,
    // 最高价 (厘)
    pub high: i64,
    // 最低价 (厘)
    pub low: i64,
    // 收盘价 (厘)
    pub close: i64,
    // 成交量 (手)
    pub volume: i64,
    // 成交额 (厘)
    pub amount: f64,
}

impl Candle {
    /// 收盘价 (元)
    pub fn close_yuan(&self) -> f64 {
        li_to_yuan(self.close)
    }
}

/// # Summary
/// 盘口单档报价。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceLevel {
    // 价格 (厘)
    pub price: i64,
    // 挂单量 (股)
    pub size: i64,
}

/// # Summary
/// 实时行情快照，包含当日价格、成交以及五档盘口。
///
/// # Invariants
/// - `bids` 与 `asks` 各自最多五档，按价格优先级排列。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Quote {
    // 证券代码
    pub code: String,
    // 昨收价 (厘)
    pub prev_close: i64,
    // 今日开盘价 (厘)
    pub open: i64,
    // 今日最高价 (厘)
    pub high: i64,
    // 今日最低价 (厘)
    pub low: i64,
    // 最新价 (厘)
    pub last: i64,
    // 总成交量 (手)
    pub total_hands: i64,
    // 成交额 (厘)
    pub amount: f64,
    // 内盘
    pub inner: i64,
    // 外盘
    pub outer: i64,
    // 买五档
    pub bids: Vec<PriceLevel>,
    // 卖五档
    pub asks: Vec<PriceLevel>,
}

/// # Summary
/// 分时成交明细中的单条记录。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tick {
    // 时间 (HH:MM)
    pub time: String,
    // 价格 (厘)
    pub price: i64,
    // 成交量 (手)
    pub volume: i64,
}

/// 证券搜索结果。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub code: String,
    pub name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unit_conversion() {
        assert!((li_to_yuan(10_000) - 10.0).abs() < f64::EPSILON);
        assert_eq!(hands_to_shares(12), 1200);
        assert!((amount_to_yuan(2500.0) - 2.5).abs() < f64::EPSILON);
    }
}
