use crate::dingtalk::DingTalkNotifier;
use crate::email::EmailNotifier;
use crate::feishu::FeishuNotifier;
use crate::telegram::TelegramNotifier;
use async_trait::async_trait;
use futures::future::join_all;
use kanshi_core::config::NotificationConfig;
use kanshi_core::notify::entity::TradingSignal;
use kanshi_core::notify::error::NotifyError;
use kanshi_core::notify::port::Notifier;
use std::sync::Arc;
use tracing::{info, warn};

/// # Summary
/// 组合通知器，把同一条消息并发发往所有渠道。
///
/// # Invariants
/// - 每个渠道独立尝试，一个渠道失败不影响其他渠道。
/// - 任一渠道失败时返回 `Partial`，列出所有失败渠道。
pub struct MultiNotifier {
    channels: Vec<(String, Arc<dyn Notifier>)>,
}

impl MultiNotifier {
    pub fn new(channels: Vec<(String, Arc<dyn Notifier>)>) -> Self {
        Self { channels }
    }

    pub fn len(&self) -> usize {
        self.channels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.channels.is_empty()
    }

    /// 渠道名称列表
    pub fn channel_names(&self) -> Vec<&str> {
        self.channels.iter().map(|(name, _)| name.as_str()).collect()
    }

    /// # Summary
    /// 按配置构建组合通知器。
    ///
    /// # Logic
    /// 1. 通知总开关关闭时返回 None。
    /// 2. 依次添加启用的钉钉、飞书、Telegram 与邮件渠道。
    /// 3. 没有任何启用渠道时返回 None。
    pub fn from_config(config: &NotificationConfig) -> Result<Option<Self>, NotifyError> {
        if !config.enabled {
            return Ok(None);
        }

        let mut channels: Vec<(String, Arc<dyn Notifier>)> = Vec::new();
        if config.dingtalk.enabled {
            channels.push((
                "dingtalk".to_string(),
                Arc::new(DingTalkNotifier::new(
                    &config.dingtalk.webhook_url,
                    &config.dingtalk.secret,
                )),
            ));
        }
        if config.feishu.enabled {
            channels.push((
                "feishu".to_string(),
                Arc::new(FeishuNotifier::new(
                    &config.feishu.webhook_url,
                    &config.feishu.secret,
                )),
            ));
        }
        if config.telegram.enabled {
            channels.push((
                "telegram".to_string(),
                Arc::new(TelegramNotifier::new(
                    &config.telegram.bot_token,
                    &config.telegram.chat_id,
                )),
            ));
        }
        if config.email.enabled {
            let e = &config.email;
            channels.push((
                "email".to_string(),
                Arc::new(EmailNotifier::new(&e.host, &e.user, &e.password, &e.from, &e.to)?),
            ));
        }

        if channels.is_empty() {
            return Ok(None);
        }
        let notifier = Self::new(channels);
        info!(channels = ?notifier.channel_names(), "notification channels configured");
        Ok(Some(notifier))
    }

    fn collect(&self, results: Vec<Result<(), NotifyError>>) -> Result<(), NotifyError> {
        let failures: Vec<String> = self
            .channels
            .iter()
            .zip(results)
            .filter_map(|((name, _), result)| {
                result.err().map(|e| {
                    warn!(channel = %name, "notification failed: {}", e);
                    format!("{}: {}", name, e)
                })
            })
            .collect();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(NotifyError::Partial(failures))
        }
    }
}

#[async_trait]
impl Notifier for MultiNotifier {
    async fn send_signal(&self, signal: &TradingSignal) -> Result<(), NotifyError> {
        let results = join_all(self.channels.iter().map(|(_, n)| n.send_signal(signal))).await;
        self.collect(results)
    }

    async fn send_message(&self, message: &str) -> Result<(), NotifyError> {
        let results = join_all(self.channels.iter().map(|(_, n)| n.send_message(message))).await;
        self.collect(results)
    }
}
