use kanshi_core::config::AiConfig;
use kanshi_core::reasoning::port::ReasoningService;
use kanshi_reasoning::chat::ChatClient;
use std::env;

/// # Summary
/// 集成测试：向真实推理平台发送一次请求。
///
/// # Logic
/// 1. 加载 .env 环境变量。
/// 2. 从环境变量获取平台与 API Key。
/// 3. 发送简短提示并断言返回非空文本。
#[tokio::test]
#[ignore] // 默认忽略，仅在手动测试时通过环境变量开启
async fn test_chat_completion() {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let _ = dotenvy::dotenv();
    let config = AiConfig {
        provider: env::var("KANSHI_AI_PROVIDER").unwrap_or_else(|_| "deepseek".to_string()),
        api_key: env::var("KANSHI_AI_API_KEY").expect("KANSHI_AI_API_KEY must be set"),
        ..AiConfig::default()
    };

    let client = ChatClient::from_config(&config).unwrap();
    let result = client
        .complete("你是一个简洁的助手。", "只回复 JSON: {\"signal\":\"HOLD\"}")
        .await;

    assert!(result.is_ok(), "chat completion failed: {:?}", result);
    assert!(!result.unwrap_or_default().is_empty());
}
