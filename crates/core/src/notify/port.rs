use crate::notify::entity::TradingSignal;
use crate::notify::error::NotifyError;
use async_trait::async_trait;

/// # Summary
/// 发送通知到外部系统的接口定义。
///
/// # Invariants
/// - 实现必须是 `Send` 和 `Sync` 以支持多个标的并发调用。
/// - 调用方不做重试，失败只记录日志。
#[async_trait]
pub trait Notifier: Send + Sync {
    /// # Summary
    /// 发送结构化的交易信号。
    ///
    /// # Logic
    /// 1. 根据目标平台要求格式化消息 (Markdown、卡片等)。
    /// 2. 通过底层传输协议发送消息。
    ///
    /// # Arguments
    /// * `signal` - 交易信号载荷。
    ///
    /// # Returns
    /// * 成功返回 `Ok(())`，失败返回 `Err(NotifyError)`。
    async fn send_signal(&self, signal: &TradingSignal) -> Result<(), NotifyError>;

    /// 发送纯文本消息。
    async fn send_message(&self, message: &str) -> Result<(), NotifyError>;
}
