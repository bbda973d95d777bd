use crate::format;
use crate::sign;
use async_trait::async_trait;
use chrono::Utc;
use kanshi_core::analysis::entity::Signal;
use kanshi_core::notify::entity::TradingSignal;
use kanshi_core::notify::error::NotifyError;
use kanshi_core::notify::port::Notifier;
use serde::Deserialize;
use serde_json::{Value, json};

/// # Summary
/// 飞书自定义机器人通知器。
///
/// # Invariants
/// - 配置了密钥时，签名与时间戳写入消息体而不是 URL。
pub struct FeishuNotifier {
    webhook_url: String,
    secret: Option<String>,
    client: reqwest::Client,
}

/// 飞书接口响应，新旧版本字段名不同，可能同时出现
#[derive(Deserialize, Debug)]
struct FeishuResponse {
    #[serde(default)]
    code: Option<i64>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default, rename = "StatusCode")]
    status_code: Option<i64>,
    #[serde(default, rename = "StatusMessage")]
    status_message: Option<String>,
}

impl FeishuResponse {
    fn code(&self) -> i64 {
        self.code.or(self.status_code).unwrap_or(0)
    }

    fn message(&self) -> &str {
        self.msg
            .as_deref()
            .or(self.status_message.as_deref())
            .unwrap_or_default()
    }
}

/// 卡片标题颜色：BUY 红，SELL 绿，HOLD 黄
pub fn card_color(signal: Signal) -> &'static str {
    match signal {
        Signal::Buy => "red",
        Signal::Sell => "green",
        Signal::Hold => "yellow",
    }
}

fn field(content: String) -> Value {
    json!({
        "is_short": true,
        "text": { "tag": "lark_md", "content": content }
    })
}

/// # Summary
/// 构建交互式卡片负载。
///
/// # Logic
/// 1. 标题带信号图标，颜色按信号区分。
/// 2. 价格与信心度并排展示，目标价与止损价仅在有值时展示。
/// 3. 分析理由与时间放在卡片底部。
pub fn card_payload(s: &TradingSignal) -> Value {
    let mut elements = vec![json!({
        "tag": "div",
        "fields": [
            field(format!("**当前价格**\n{:.2}元", s.price)),
            field(format!("**信心度**\n{}%", s.confidence)),
        ]
    })];

    let mut targets = Vec::new();
    if s.target_price > 0.0 {
        targets.push(field(format!("**目标价格**\n{:.2}元", s.target_price)));
    }
    if s.stop_loss > 0.0 {
        targets.push(field(format!("**止损价格**\n{:.2}元", s.stop_loss)));
    }
    if !targets.is_empty() {
        elements.push(json!({ "tag": "div", "fields": targets }));
    }

    elements.push(json!({ "tag": "hr" }));
    elements.push(json!({
        "tag": "div",
        "text": { "tag": "lark_md", "content": format!("**分析原因**\n{}", s.reasoning) }
    }));
    elements.push(json!({
        "tag": "note",
        "elements": [{ "tag": "plain_text", "content": format::local_time(s.timestamp) }]
    }));

    json!({
        "msg_type": "interactive",
        "card": {
            "header": {
                "title": {
                    "tag": "plain_text",
                    "content": format!(
                        "{} {}信号 - {}({})",
                        format::emoji(s.signal),
                        s.signal,
                        s.stock_name,
                        s.stock_code
                    ),
                },
                "template": card_color(s.signal),
            },
            "elements": elements,
        }
    })
}

pub fn text_payload(message: &str) -> Value {
    json!({
        "msg_type": "text",
        "content": { "text": message }
    })
}

impl FeishuNotifier {
    pub fn new(webhook_url: &str, secret: &str) -> Self {
        Self {
            webhook_url: webhook_url.to_string(),
            secret: (!secret.is_empty()).then(|| secret.to_string()),
            client: reqwest::Client::new(),
        }
    }

    /// # Summary
    /// 发送一条消息。
    ///
    /// # Logic
    /// 1. 开启加签时向负载写入秒级 `timestamp` 与 `sign`。
    /// 2. 非 2xx 或 `code != 0` 视为平台错误。
    async fn send(&self, mut payload: Value) -> Result<(), NotifyError> {
        if let Some(secret) = &self.secret {
            let timestamp = Utc::now().timestamp();
            let sign = sign::feishu_sign(timestamp, secret)?;
            if let Some(obj) = payload.as_object_mut() {
                obj.insert("timestamp".to_string(), Value::String(timestamp.to_string()));
                obj.insert("sign".to_string(), Value::String(sign));
            }
        }

        let response = self
            .client
            .post(&self.webhook_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| NotifyError::Network(e.to_string()))?;

        if !response.status().is_success() {
            return Err(NotifyError::Platform(format!(
                "Feishu HTTP {}",
                response.status()
            )));
        }

        let body: FeishuResponse = response
            .json()
            .await
            .map_err(|e| NotifyError::Platform(format!("Feishu invalid response: {}", e)))?;
        if body.code() != 0 {
            return Err(NotifyError::Platform(format!(
                "Feishu code {}: {}",
                body.code(),
                body.message()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl Notifier for FeishuNotifier {
    async fn send_signal(&self, signal: &TradingSignal) -> Result<(), NotifyError> {
        self.send(card_payload(signal)).await
    }

    async fn send_message(&self, message: &str) -> Result<(), NotifyError> {
        self.send(text_payload(message)).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::format::tests::sample_signal;

    #[test]
    fn test_card_colors() {
        assert_eq!(card_color(Signal::Buy), "red");
        assert_eq!(card_color(Signal::Sell), "green");
        assert_eq!(card_color(Signal::Hold), "yellow");
    }

    #[test]
    fn test_card_payload_omits_missing_stop() {
        let payload = card_payload(&sample_signal(Signal::Buy));
        assert_eq!(payload["msg_type"], "interactive");
        assert_eq!(payload["card"]["header"]["template"], "red");

        let elements = payload["card"]["elements"].as_array().cloned().unwrap_or_default();
        // 价格行、目标价行、分割线、理由、时间
        assert_eq!(elements.len(), 5);
        assert_eq!(elements[1]["fields"].as_array().map(Vec::len), Some(1));
    }

    #[test]
    fn test_response_aliases() {
        let old: FeishuResponse =
            serde_json::from_str(r#"{"StatusCode":0,"StatusMessage":"success"}"#).unwrap();
        assert_eq!(old.code(), 0);
        let both: FeishuResponse = serde_json::from_str(
            r#"{"StatusCode":0,"StatusMessage":"success","code":0,"data":{},"msg":"success"}"#,
        )
        .unwrap();
        assert_eq!(both.code(), 0);
        let err: FeishuResponse =
            serde_json::from_str(r#"{"code":19021,"msg":"sign match fail"}"#).unwrap();
        assert_eq!(err.code(), 19021);
        assert_eq!(err.message(), "sign match fail");
    }
}
