use thiserror::Error;

/// # Summary
/// 行情数据域错误枚举，统一归类为传输层失败。
///
/// # Invariants
/// - 任意一种错误只会终止当前分析周期，不影响该标的的后续调度。
#[derive(Error, Debug)]
pub enum MarketError {
    // 网络层错误，包含底层 HTTP 客户端错误信息
    #[error("Network error: {0}")]
    Network(String),
    // 数据解析错误，如 JSON 格式不匹配
    #[error("Parse error: {0}")]
    Parse(String),
    // 行情网关返回的业务错误 (code != 0)
    #[error("API error: {0}")]
    Api(String),
    // 请求的数据未找到
    #[error("Data not found")]
    NotFound,
}
