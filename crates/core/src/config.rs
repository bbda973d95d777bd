use crate::common::Instrument;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;
use thiserror::Error;

const DEFAULT_SCAN_MINUTES: u64 = 5;
const DEFAULT_MIN_CONFIDENCE: u8 = 70;
const DEFAULT_PORT: u16 = 9090;
const DEFAULT_LOG_DIR: &str = "stock_analysis_logs";
const DEFAULT_TIMEZONE: &str = "Asia/Shanghai";

/// 配置校验错误
#[derive(Error, Debug, PartialEq)]
pub enum ConfigError {
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// 全局应用配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    pub market: MarketConfig,
    pub ai: AiConfig,
    pub instruments: Vec<InstrumentConfig>,
    pub notification: NotificationConfig,
    pub trading_time: TradingTimeConfig,
    pub server: ServerConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MarketConfig {
    // TDX 行情网关地址
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for MarketConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            timeout_secs: 10,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    // deepseek | qwen | custom
    pub provider: String,
    pub api_key: String,
    // custom 模式必填，其他模式可覆盖默认地址
    pub base_url: String,
    pub model: String,
    pub timeout_secs: u64,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: "deepseek".to_string(),
            api_key: String::new(),
            base_url: String::new(),
            model: String::new(),
            timeout_secs: 120,
        }
    }
}

/// 单只股票的监控配置
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct InstrumentConfig {
    pub code: String,
    pub name: String,
    pub enabled: bool,
    pub scan_interval_minutes: u64,
    pub min_confidence: u8,
}

impl InstrumentConfig {
    /// 转换为领域实体
    pub fn to_instrument(&self) -> Instrument {
        Instrument {
            code: self.code.clone(),
            name: self.name.clone(),
            enabled: self.enabled,
            scan_interval: Duration::from_secs(self.scan_interval_minutes.saturating_mul(60)),
            min_confidence: self.min_confidence.min(100),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct NotificationConfig {
    pub enabled: bool,
    pub dingtalk: WebhookConfig,
    pub feishu: WebhookConfig,
    pub telegram: TelegramConfig,
    pub email: EmailConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct WebhookConfig {
    pub enabled: bool,
    pub webhook_url: String,
    // 加签密钥 (可选)
    pub secret: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct TelegramConfig {
    pub enabled: bool,
    pub bot_token: String,
    pub chat_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct EmailConfig {
    pub enabled: bool,
    // SMTP 服务器，如 smtp.qq.com
    pub host: String,
    pub user: String,
    pub password: String,
    pub from: String,
    pub to: String,
}

/// 交易时间配置
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingTimeConfig {
    pub enable_check: bool,
    // 交易时段，如 ["09:30-11:30", "13:00-15:00"]
    pub trading_hours: Vec<String>,
    // IANA 时区名，如 Asia/Shanghai
    pub timezone: String,
    // 额外的休市日期 (YYYY-MM-DD)，与内置节假日合并
    pub holidays: Vec<String>,
}

impl Default for TradingTimeConfig {
    fn default() -> Self {
        Self {
            enable_check: true,
            trading_hours: default_trading_hours(),
            timezone: DEFAULT_TIMEZONE.to_string(),
            holidays: Vec::new(),
        }
    }
}

fn default_trading_hours() -> Vec<String> {
    vec!["09:30-11:30".to_string(), "13:00-15:00".to_string()]
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub dir: String,
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            dir: DEFAULT_LOG_DIR.to_string(),
            level: "info".to_string(),
        }
    }
}

impl AppConfig {
    /// # Summary
    /// 校验配置并补全默认值。
    ///
    /// # Logic
    /// 1. 校验行情网关与 AI 提供商配置。
    /// 2. 校验股票列表：非空、代码唯一、至少启用一只，并补全扫描间隔与信心度阈值。
    /// 3. 补全端口、日志目录、时区与交易时段默认值。
    /// 4. 通知启用时至少需要一个可用渠道。
    ///
    /// # Returns
    /// * 校验失败返回 `ConfigError::Invalid`。
    pub fn validate(&mut self) -> Result<(), ConfigError> {
        if self.market.base_url.trim().is_empty() {
            return Err(invalid("market.base_url must not be empty"));
        }

        match self.ai.provider.as_str() {
            "deepseek" | "qwen" => {}
            "custom" => {
                if self.ai.base_url.is_empty() || self.ai.model.is_empty() {
                    return Err(invalid("custom ai provider requires base_url and model"));
                }
            }
            other => {
                return Err(invalid(&format!(
                    "ai.provider must be one of deepseek, qwen, custom (got '{}')",
                    other
                )));
            }
        }
        if self.ai.api_key.is_empty() {
            return Err(invalid("ai.api_key must not be empty"));
        }

        if self.instruments.is_empty() {
            return Err(invalid("at least one instrument is required"));
        }
        let mut seen = HashSet::new();
        for (i, item) in self.instruments.iter_mut().enumerate() {
            if item.code.trim().is_empty() {
                return Err(invalid(&format!("instruments[{}]: code must not be empty", i)));
            }
            if item.name.trim().is_empty() {
                return Err(invalid(&format!("instruments[{}]: name must not be empty", i)));
            }
            if !seen.insert(item.code.clone()) {
                return Err(invalid(&format!(
                    "instruments[{}]: duplicate code '{}'",
                    i, item.code
                )));
            }
            if item.scan_interval_minutes == 0 {
                item.scan_interval_minutes = DEFAULT_SCAN_MINUTES;
            }
            if item.min_confidence == 0 {
                item.min_confidence = DEFAULT_MIN_CONFIDENCE;
            }
        }
        if !self.instruments.iter().any(|s| s.enabled) {
            return Err(invalid("at least one instrument must be enabled"));
        }

        if self.server.port == 0 {
            self.server.port = DEFAULT_PORT;
        }
        if self.log.dir.is_empty() {
            self.log.dir = DEFAULT_LOG_DIR.to_string();
        }
        if self.trading_time.timezone.is_empty() {
            self.trading_time.timezone = DEFAULT_TIMEZONE.to_string();
        }
        if self.trading_time.trading_hours.is_empty() {
            self.trading_time.trading_hours = default_trading_hours();
        }

        let n = &self.notification;
        if n.enabled {
            if !n.dingtalk.enabled && !n.feishu.enabled && !n.telegram.enabled && !n.email.enabled {
                return Err(invalid("notification enabled but no channel is enabled"));
            }
            if n.dingtalk.enabled && n.dingtalk.webhook_url.is_empty() {
                return Err(invalid("dingtalk enabled without webhook_url"));
            }
            if n.feishu.enabled && n.feishu.webhook_url.is_empty() {
                return Err(invalid("feishu enabled without webhook_url"));
            }
            if n.telegram.enabled && (n.telegram.bot_token.is_empty() || n.telegram.chat_id.is_empty()) {
                return Err(invalid("telegram enabled without bot_token or chat_id"));
            }
            if n.email.enabled && (n.email.host.is_empty() || n.email.from.is_empty() || n.email.to.is_empty()) {
                return Err(invalid("email enabled without host, from or to"));
            }
        }

        Ok(())
    }

    /// 启用的监控标的
    pub fn enabled_instruments(&self) -> Vec<Instrument> {
        self.instruments
            .iter()
            .filter(|s| s.enabled)
            .map(InstrumentConfig::to_instrument)
            .collect()
    }
}

fn invalid(msg: &str) -> ConfigError {
    ConfigError::Invalid(msg.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> AppConfig {
        let mut config = AppConfig::default();
        config.ai.api_key = "sk-test".to_string();
        config.instruments = vec![
            InstrumentConfig {
                code: "600000".to_string(),
                name: "浦发银行".to_string(),
                enabled: true,
                scan_interval_minutes: 0,
                min_confidence: 0,
            },
            InstrumentConfig {
                code: "000001".to_string(),
                name: "平安银行".to_string(),
                enabled: false,
                scan_interval_minutes: 15,
                min_confidence: 80,
            },
        ];
        config
    }

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.log.dir, "stock_analysis_logs");
        assert_eq!(config.trading_time.timezone, "Asia/Shanghai");
        assert_eq!(config.trading_time.trading_hours.len(), 2);
    }

    #[test]
    fn test_validate_fills_defaults() {
        let mut config = valid_config();
        config.trading_time.trading_hours.clear();
        config.trading_time.timezone.clear();
        assert_eq!(config.validate(), Ok(()));
        assert_eq!(config.instruments[0].scan_interval_minutes, 5);
        assert_eq!(config.instruments[0].min_confidence, 70);
        assert_eq!(config.trading_time.timezone, "Asia/Shanghai");
        assert_eq!(config.trading_time.trading_hours, default_trading_hours());

        let enabled = config.enabled_instruments();
        assert_eq!(enabled.len(), 1);
        assert_eq!(enabled[0].scan_interval, Duration::from_secs(300));
    }

    #[test]
    fn test_validate_rejects_duplicates_and_bad_provider() {
        let mut config = valid_config();
        config.instruments[1].code = "600000".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.ai.provider = "openai".to_string();
        assert!(config.validate().is_err());

        let mut config = valid_config();
        config.instruments[0].enabled = false;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_notification_channels() {
        let mut config = valid_config();
        config.notification.enabled = true;
        assert!(config.validate().is_err());

        config.notification.dingtalk.enabled = true;
        assert!(config.validate().is_err());

        config.notification.dingtalk.webhook_url = "https://oapi.dingtalk.com/robot/send".to_string();
        assert_eq!(config.validate(), Ok(()));

        config.notification.email.enabled = true;
        config.notification.email.host = "smtp.qq.com".to_string();
        assert!(config.validate().is_err());
        config.notification.email.from = "bot@example.com".to_string();
        config.notification.email.to = "me@example.com".to_string();
        assert_eq!(config.validate(), Ok(()));
    }
}
