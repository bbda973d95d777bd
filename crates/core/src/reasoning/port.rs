use crate::reasoning::error::ReasoningError;
use async_trait::async_trait;

/// # Summary
/// 外部推理服务接口，把行情上下文提示词转换为自由文本的交易建议。
///
/// # Invariants
/// - 返回文本没有任何结构保证，结构化提取由决策解析器负责。
#[async_trait]
pub trait ReasoningService: Send + Sync {
    /// # Summary
    /// 以系统角色描述和用户提示词调用推理服务。
    ///
    /// # Arguments
    /// * `system` - 系统角色描述。
    /// * `prompt` - 渲染后的用户提示词。
    ///
    /// # Returns
    /// * 成功返回推理服务的原始文本。
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ReasoningError>;
}
