use chrono::{TimeZone, Utc};
use kanshi_core::analysis::entity::{IndicatorSet, Signal};
use kanshi_core::config::NotificationConfig;
use kanshi_core::notify::entity::TradingSignal;
use kanshi_core::notify::error::NotifyError;
use kanshi_core::notify::port::Notifier;
use kanshi_core::test_utils::RecordingNotifier;
use kanshi_notify::multi::MultiNotifier;
use std::sync::Arc;

fn buy_signal() -> TradingSignal {
    TradingSignal {
        stock_code: "600000".to_string(),
        stock_name: "浦发银行".to_string(),
        signal: Signal::Buy,
        price: 10.0,
        confidence: 85,
        reasoning: "放量突破".to_string(),
        target_price: 10.8,
        stop_loss: 9.6,
        risk_reward: "1:2".to_string(),
        timestamp: Utc.with_ymd_and_hms(2025, 3, 10, 2, 0, 0).unwrap(),
        indicators: IndicatorSet::default(),
    }
}

/// # Summary
/// 一个渠道失败时，其他渠道仍然收到信号，整体返回 Partial。
#[tokio::test]
async fn test_failing_channel_does_not_block_others() {
    let ok_a = Arc::new(RecordingNotifier::default());
    let bad = Arc::new(RecordingNotifier::failing());
    let ok_b = Arc::new(RecordingNotifier::default());
    let multi = MultiNotifier::new(vec![
        ("a".to_string(), ok_a.clone() as Arc<dyn Notifier>),
        ("bad".to_string(), bad.clone() as Arc<dyn Notifier>),
        ("b".to_string(), ok_b.clone() as Arc<dyn Notifier>),
    ]);

    let result = multi.send_signal(&buy_signal()).await;

    assert_eq!(ok_a.signal_count().await, 1);
    assert_eq!(bad.signal_count().await, 1);
    assert_eq!(ok_b.signal_count().await, 1);
    match result {
        Err(NotifyError::Partial(failures)) => {
            assert_eq!(failures.len(), 1);
            assert!(failures[0].starts_with("bad: "));
        }
        other => panic!("expected partial failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_all_channels_ok() {
    let a = Arc::new(RecordingNotifier::default());
    let multi = MultiNotifier::new(vec![("a".to_string(), a.clone() as Arc<dyn Notifier>)]);

    multi.send_message("hello").await.unwrap();
    assert_eq!(a.messages.lock().await.as_slice(), ["hello".to_string()]);
}

#[test]
fn test_from_config_without_channels() {
    let _ = rustls::crypto::ring::default_provider().install_default();

    let mut config = NotificationConfig::default();
    assert!(MultiNotifier::from_config(&config).unwrap().is_none());

    config.enabled = true;
    assert!(MultiNotifier::from_config(&config).unwrap().is_none());

    config.dingtalk.enabled = true;
    config.dingtalk.webhook_url = "https://oapi.dingtalk.com/robot/send?access_token=x".to_string();
    config.telegram.enabled = true;
    config.telegram.bot_token = "token".to_string();
    config.telegram.chat_id = "1".to_string();
    let multi = MultiNotifier::from_config(&config).unwrap().unwrap();
    assert_eq!(multi.channel_names(), vec!["dingtalk", "telegram"]);
}
