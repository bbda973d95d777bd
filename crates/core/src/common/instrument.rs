use serde::{Deserialize, Serialize};
use std::time::Duration;

/// # Summary
/// 监控标的实体，代表一只被持续分析的证券。
///
/// # Invariants
/// - 配置加载后不可变，每个证券代码对应唯一一个实例。
/// - `scan_interval` 必须大于零。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Instrument {
    // 证券代码 (例如: 600000)
    pub code: String,
    // 显示名称 (例如: 浦发银行)
    pub name: String,
    // 是否启用监控
    pub enabled: bool,
    // 扫描间隔
    pub scan_interval: Duration,
    // 最小信心度阈值，低于该值不发送通知
    pub min_confidence: u8,
}

/// # Summary
/// K 线周期枚举，对应行情网关支持的粒度。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum KlineKind {
    Minute1,
    Minute5,
    Minute15,
    Minute30,
    Hour,
    Day,
    Week,
    Month,
}

impl KlineKind {
    /// 行情网关使用的 `type` 参数值
    pub fn as_param(&self) -> &'static str {
        match self {
            KlineKind::Minute1 => "minute1",
            KlineKind::Minute5 => "minute5",
            KlineKind::Minute15 => "minute15",
            KlineKind::Minute30 => "minute30",
            KlineKind::Hour => "hour",
            KlineKind::Day => "day",
            KlineKind::Week => "week",
            KlineKind::Month => "month",
        }
    }
}

impl std::fmt::Display for KlineKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_param())
    }
}

/// # Summary
/// 复权方式。
///
/// # Invariants
/// - 实时行情为不复权价格，需要与之对齐的分析一律使用 `None`。
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub enum Adjust {
    // 不复权
    #[default]
    None,
    // 前复权
    Forward,
    // 后复权
    Backward,
}

impl Adjust {
    /// 行情网关使用的 `adjust` 参数值
    pub fn as_param(&self) -> &'static str {
        match self {
            Adjust::None => "0",
            Adjust::Forward => "1",
            Adjust::Backward => "2",
        }
    }
}
