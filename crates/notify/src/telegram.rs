use crate::format;
use async_trait::async_trait;
use kanshi_core::notify::entity::TradingSignal;
use kanshi_core::notify::error::NotifyError;
use kanshi_core::notify::port::Notifier;
use serde::Serialize;

/// # Summary
/// 通过 Telegram Bot API 发送消息的通知器。
///
/// # Invariants
/// * `bot_token` 必须有效。
/// * `chat_id` 必须对该机器人可见。
pub struct TelegramNotifier {
    bot_token: String,
    chat_id: String,
    client: reqwest::Client,
}

/// `sendMessage` 接口负载
#[derive(Serialize)]
struct TelegramMessage<'a> {
    chat_id: &'a str,
    text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    parse_mode: Option<&'static str>,
}

impl TelegramNotifier {
    pub fn new(bot_token: &str, chat_id: &str) -> Self {
        Self {
            bot_token: bot_token.to_string(),
            chat_id: chat_id.to_string(),
            client: reqwest::Client::new(),
        }
    }

    /// # Summary
    /// 调用 `sendMessage`。
    ///
    /// # Logic
    /// 1. 构建 Bot API 地址。
    /// 2. POST JSON 负载。
    /// 3. 非 2xx 时携带响应体返回平台错误。
    async fn post(&self, text: String, parse_mode: Option<&'static str>) -> Result<(), NotifyError> {
        let url = format!("https://api.telegram.org/bot{}/sendMessage", self.bot_token);
        let payload = TelegramMessage {
            chat_id: &self.chat_id,
            text,
            parse_mode,
        };

        let response = self
            .client
            .post(&url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(NotifyError::Platform(format!(
                "Telegram API error: {}",
                error_text
            )));
        }

        Ok(())
    }
}

#[async_trait]
impl Notifier for TelegramNotifier {
    async fn send_signal(&self, signal: &TradingSignal) -> Result<(), NotifyError> {
        // 理由文本来自推理服务，可能包含 Markdown 保留字符，按纯文本发送
        self.post(format::plain(signal), None).await
    }

    async fn send_message(&self, message: &str) -> Result<(), NotifyError> {
        self.post(message.to_string(), None).await
    }
}
