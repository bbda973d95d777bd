use thiserror::Error;

/// # Summary
/// 推理服务错误枚举。
///
/// # Invariants
/// - 属于传输层失败，只终止当前分析周期。
#[derive(Error, Debug)]
pub enum ReasoningError {
    /// 网络连接或传输错误
    #[error("Network error: {0}")]
    Network(String),

    /// 推理平台返回的错误 (非 2xx 或错误体)
    #[error("Platform error: {0}")]
    Platform(String),

    /// 响应中没有任何可用的文本
    #[error("Empty response")]
    Empty,
}
