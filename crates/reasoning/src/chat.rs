use async_trait::async_trait;
use kanshi_core::config::AiConfig;
use kanshi_core::reasoning::error::ReasoningError;
use kanshi_core::reasoning::port::ReasoningService;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

/// 默认采样温度，偏低以获得稳定的结构化输出
pub const DEFAULT_TEMPERATURE: f32 = 0.3;
/// 单次回复的最大 token 数
pub const DEFAULT_MAX_TOKENS: u32 = 2000;
/// 未配置超时时使用的默认值
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(120);

/// # Summary
/// 推理平台预设。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Provider {
    DeepSeek,
    Qwen,
    // 显式指定接口地址与模型
    Custom { base_url: String, model: String },
}

impl Provider {
    /// # Summary
    /// 由配置解析平台预设。
    ///
    /// # Logic
    /// 1. `deepseek` / `qwen` 使用内置地址与模型，配置中非空的值会覆盖预设。
    /// 2. `custom` 必须同时提供地址与模型。
    pub fn from_config(config: &AiConfig) -> Result<(Self, String, String), ReasoningError> {
        let provider = match config.provider.as_str() {
            "deepseek" => Provider::DeepSeek,
            "qwen" => Provider::Qwen,
            "custom" => {
                if config.base_url.is_empty() || config.model.is_empty() {
                    return Err(ReasoningError::Platform(
                        "custom provider requires base_url and model".to_string(),
                    ));
                }
                Provider::Custom {
                    base_url: config.base_url.clone(),
                    model: config.model.clone(),
                }
            }
            other => {
                return Err(ReasoningError::Platform(format!("unknown provider: {}", other)));
            }
        };

        let base_url = if config.base_url.is_empty() {
            provider.default_base_url().to_string()
        } else {
            config.base_url.clone()
        };
        let model = if config.model.is_empty() {
            provider.default_model().to_string()
        } else {
            config.model.clone()
        };
        Ok((provider, base_url, model))
    }

    pub fn default_base_url(&self) -> &str {
        match self {
            Provider::DeepSeek => "https://api.deepseek.com/v1",
            Provider::Qwen => "https://dashscope.aliyuncs.com/compatible-mode/v1",
            Provider::Custom { base_url, .. } => base_url,
        }
    }

    pub fn default_model(&self) -> &str {
        match self {
            Provider::DeepSeek => "deepseek-chat",
            Provider::Qwen => "qwen-plus",
            Provider::Custom { model, .. } => model,
        }
    }
}

/// # Summary
/// OpenAI 兼容的对话补全客户端。
///
/// # Invariants
/// - 每次调用只发送 system 与 user 两条消息，不保留会话上下文。
/// - 不做重试，失败由下一次调度自然重试。
#[derive(Clone)]
pub struct ChatClient {
    client: Client,
    endpoint: String,
    api_key: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Deserialize, Debug)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize, Debug)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize, Debug)]
struct ChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

impl ChatClient {
    /// # Summary
    /// 创建客户端。
    ///
    /// # Arguments
    /// * `base_url` - 接口根地址，例如 `https://api.deepseek.com/v1`。
    /// * `api_key` - Bearer 令牌。
    /// * `model` - 模型名称。
    /// * `timeout` - 单次请求超时。
    pub fn new(
        base_url: &str,
        api_key: &str,
        model: &str,
        timeout: Duration,
    ) -> Result<Self, ReasoningError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ReasoningError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }

    /// 按配置中的平台预设创建客户端
    pub fn from_config(config: &AiConfig) -> Result<Self, ReasoningError> {
        let (_, base_url, model) = Provider::from_config(config)?;
        let timeout = if config.timeout_secs == 0 {
            DEFAULT_TIMEOUT
        } else {
            Duration::from_secs(config.timeout_secs)
        };
        Self::new(&base_url, &config.api_key, &model, timeout)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

fn first_content(resp: ChatResponse) -> Result<String, ReasoningError> {
    resp.choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|s| !s.trim().is_empty())
        .ok_or(ReasoningError::Empty)
}

#[async_trait]
impl ReasoningService for ChatClient {
    /// # Summary
    /// 发送一次对话补全请求。
    ///
    /// # Logic
    /// 1. 以 system + user 两条消息构建请求体。
    /// 2. 非 2xx 状态码映射为 `Platform`，并携带响应体。
    /// 3. 返回第一个 choice 的文本，缺失时返回 `Empty`。
    async fn complete(&self, system: &str, prompt: &str) -> Result<String, ReasoningError> {
        let body = ChatRequest {
            model: &self.model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: system,
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: DEFAULT_MAX_TOKENS,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "chat completion request");
        let resp = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| ReasoningError::Network(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(ReasoningError::Platform(format!("HTTP {}: {}", status, text)));
        }

        let parsed: ChatResponse = resp
            .json()
            .await
            .map_err(|e| ReasoningError::Platform(format!("invalid response body: {}", e)))?;
        first_content(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ai(provider: &str) -> AiConfig {
        AiConfig {
            provider: provider.to_string(),
            api_key: "sk-test".to_string(),
            ..AiConfig::default()
        }
    }

    #[test]
    fn test_provider_presets() {
        let (p, url, model) = Provider::from_config(&ai("deepseek")).unwrap();
        assert_eq!(p, Provider::DeepSeek);
        assert_eq!(url, "https://api.deepseek.com/v1");
        assert_eq!(model, "deepseek-chat");

        let mut cfg = ai("qwen");
        cfg.model = "qwen-max".to_string();
        let (_, url, model) = Provider::from_config(&cfg).unwrap();
        assert_eq!(url, "https://dashscope.aliyuncs.com/compatible-mode/v1");
        assert_eq!(model, "qwen-max");
    }

    #[test]
    fn test_custom_requires_url_and_model() {
        assert!(Provider::from_config(&ai("custom")).is_err());
        assert!(Provider::from_config(&ai("openai")).is_err());

        let _ = rustls::crypto::ring::default_provider().install_default();
        let mut cfg = ai("custom");
        cfg.base_url = "http://localhost:11434/v1/".to_string();
        cfg.model = "llama3".to_string();
        let client = ChatClient::from_config(&cfg).unwrap();
        assert_eq!(client.endpoint(), "http://localhost:11434/v1/chat/completions");
        assert_eq!(client.model(), "llama3");
    }

    #[test]
    fn test_first_content() {
        let resp: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"signal\":\"HOLD\"}"}}]}"#,
        )
        .unwrap();
        assert_eq!(first_content(resp).unwrap(), "{\"signal\":\"HOLD\"}");

        let empty: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(matches!(first_content(empty), Err(ReasoningError::Empty)));
    }
}
