use thiserror::Error;

/// # Summary
/// 通知服务错误枚举。
///
/// # Invariants
/// - 必须通过 `thiserror` 派生 `Error` trait。
#[derive(Error, Debug)]
pub enum NotifyError {
    /// 网络连接或传输错误
    #[error("Network error: {0}")]
    Network(String),

    /// 配置错误 (如缺少 Webhook 地址)
    #[error("Configuration error: {0}")]
    Config(String),

    /// 推送平台返回的错误 (如钉钉 errcode != 0)
    #[error("Platform error: {0}")]
    Platform(String),

    /// 组合通知器中部分渠道失败
    #[error("{} channel(s) failed: {}", .0.len(), .0.join("; "))]
    Partial(Vec<String>),
}
