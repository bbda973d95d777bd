use crate::format;
use crate::sign;
use async_trait::async_trait;
use chrono::Utc;
use kanshi_core::notify::entity::TradingSignal;
use kanshi_core::notify::error::NotifyError;
use kanshi_core::notify::port::Notifier;
use serde::Deserialize;
use serde_json::{Value, json};

/// # Summary
/// 钉钉自定义机器人通知器。
///
/// # Invariants
/// - 配置了密钥时，每次请求的 URL 都携带新的 `timestamp` 与 `sign`。
pub struct DingTalkNotifier {
    webhook_url: String,
    // 加签密钥，空字符串视为未开启加签
    secret: Option<String>,
    client: reqwest::Client,
}

/// 钉钉接口响应
#[derive(Deserialize, Debug)]
struct DingTalkResponse {
    #[serde(default)]
    errcode: i64,
    #[serde(default)]
    errmsg: String,
}

impl DingTalkNotifier {
    pub fn new(webhook_url: &str, secret: &str) -> Self {
        Self {
            webhook_url: webhook_url.to_string(),
            secret: (!secret.is_empty()).then(|| secret.to_string()),
            client: reqwest::Client::new(),
        }
    }

    /// # Summary
    /// 发送一条消息到机器人。
    ///
    /// # Logic
    /// 1. 开启加签时计算毫秒时间戳与签名，作为查询参数附加。
    /// 2. POST JSON 负载。
    /// 3. 非 2xx 或 `errcode != 0` 视为平台错误。
    async fn send(&self, payload: &Value) -> Result<(), NotifyError> {
        let mut req = self.client.post(&self.webhook_url);
        if let Some(secret) = &self.secret {
            let timestamp = Utc::now().timestamp_millis();
            let sign = sign::dingtalk_sign(timestamp, secret)?;
            req = req.query(&[("timestamp", timestamp.to_string()), ("sign", sign)]);
        }

        let response = req
            .json(payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Platform(format!(
                "DingTalk HTTP {}",
                response.status()
            )));
        }

        let body: DingTalkResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Platform(format!("DingTalk invalid response: {}", e)))?;
        if body.errcode != 0 {
            return Err(NotifyError::Platform(format!(
                "DingTalk errcode {}: {}",
                body.errcode, body.errmsg
            )));
        }
        Ok(())
    }
}

/// 信号的 markdown 消息负载
pub fn signal_payload(signal: &TradingSignal) -> Value {
    json!({
        "msgtype": "markdown",
        "markdown": {
            "title": format::title(signal),
            "text": format::markdown(signal),
        }
    })
}

/// 纯文本消息负载
pub fn text_payload(message: &str) -> Value {
    json!({
        "msgtype": "text",
        "text": { "content": message }
    })
}

#[async_trait]
impl Notifier for DingTalkNotifier {
    async fn send_signal(&self, signal: &TradingSignal) -> Result<(), NotifyError> {
        self.send(&signal_payload(signal)).await
    }

    async fn send_message(&self, message: &str) -> Result<(), NotifyError> {
        self.send(&text_payload(message)).await
    }
}
