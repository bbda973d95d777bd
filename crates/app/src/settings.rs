use config::{Config, Environment, File, FileFormat};
use kanshi_core::config::AppConfig;

/// 未通过命令行指定时的配置文件路径
pub const DEFAULT_CONFIG_PATH: &str = "config/kanshi.toml";

/// # Summary
/// 加载并校验应用配置。
///
/// # Logic
/// 1. 读取可选的配置文件 (不存在时跳过)。
/// 2. 叠加 `KANSHI_` 前缀的环境变量，层级以 `__` 分隔，例如 `KANSHI_AI__API_KEY`。
/// 3. 反序列化后执行校验并补全默认值。
pub fn load(path: &str) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let builder = Config::builder().add_source(File::with_name(path).required(false));
    from_builder(builder)
}

fn from_builder(
    builder: config::ConfigBuilder<config::builder::DefaultState>,
) -> Result<AppConfig, Box<dyn std::error::Error>> {
    let mut app: AppConfig = builder
        .add_source(
            Environment::with_prefix("KANSHI")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        )
        .build()?
        .try_deserialize()?;
    app.validate()?;
    Ok(app)
}

/// 从 TOML 文本加载配置，同样叠加环境变量
pub fn load_str(toml: &str) -> Result<AppConfig, Box<dyn std::error::Error>> {
    from_builder(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
[market]
base_url = "http://127.0.0.1:8080"

[ai]
provider = "deepseek"
api_key = "sk-test"

[[instruments]]
code = "600000"
name = "浦发银行"
enabled = true
scan_interval_minutes = 0

[[instruments]]
code = "000001"
name = "平安银行"
enabled = false

[notification]
enabled = true

[notification.dingtalk]
enabled = true
webhook_url = "https://oapi.dingtalk.com/robot/send?access_token=x"
secret = "SECtest"

[server]
port = 0
"#;

    #[test]
    fn test_load_sample_applies_defaults() {
        let config = load_str(SAMPLE).unwrap();
        assert_eq!(config.instruments.len(), 2);
        assert_eq!(config.instruments[0].scan_interval_minutes, 5);
        assert_eq!(config.instruments[0].min_confidence, 70);
        assert_eq!(config.server.port, 9090);
        assert_eq!(config.trading_time.timezone, "Asia/Shanghai");
        assert_eq!(config.enabled_instruments().len(), 1);
        assert!(config.notification.dingtalk.enabled);
    }

    #[test]
    fn test_load_rejects_invalid() {
        let broken = SAMPLE.replace("provider = \"deepseek\"", "provider = \"openai\"");
        assert!(load_str(&broken).is_err());
    }
}
