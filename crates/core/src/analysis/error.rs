use crate::market::error::MarketError;
use crate::reasoning::error::ReasoningError;
use thiserror::Error;

/// # Summary
/// 决策提取与校验错误。
///
/// # Invariants
/// - 两种错误在流水线中都不会向上传播，而是被替换为合成的 HOLD 决策。
#[derive(Error, Debug, PartialEq)]
pub enum DecisionError {
    // 文本中没有可提取或可解码的决策对象
    #[error("Parse error: {0}")]
    Parse(String),
    // 决策语义不合法 (如 BUY 缺少目标价)
    #[error("Validation error: {0}")]
    Validation(String),
}

/// # Summary
/// 交易日历配置错误。
#[derive(Error, Debug, PartialEq)]
pub enum CalendarError {
    // 时区名无法解析或交易时段格式错误
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// # Summary
/// 分析周期级错误，只终止当前周期。
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Transport error: {0}")]
    Transport(#[from] MarketError),
    #[error("Reasoning error: {0}")]
    Reasoning(#[from] ReasoningError),
}
