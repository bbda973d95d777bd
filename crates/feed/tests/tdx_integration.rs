use kanshi_core::common::{Adjust, KlineKind};
use kanshi_core::market::port::MarketDataSource;
use kanshi_feed::tdx::{DEFAULT_TIMEOUT, TdxProvider};
use std::env;

fn provider() -> TdxProvider {
    let _ = rustls::crypto::ring::default_provider().install_default();
    let _ = dotenvy::dotenv();
    let base_url = env::var("KANSHI_TDX_URL").unwrap_or_else(|_| "http://localhost:8080".to_string());
    TdxProvider::new(&base_url, DEFAULT_TIMEOUT).unwrap()
}

/// # Summary
/// 集成测试：从真实网关获取行情与日 K。
///
/// # Logic
/// 1. 从环境变量读取网关地址。
/// 2. 获取 600000 的行情快照与最近 60 根日 K。
/// 3. 断言 K 线数量不超过请求数量且按时间升序。
#[tokio::test]
#[ignore] // 需要本地运行行情网关
async fn test_tdx_real_fetch() {
    let provider = provider();

    let quote = provider.get_quote("600000").await;
    assert!(quote.is_ok(), "quote failed: {:?}", quote.err());

    let candles = provider
        .get_candles("600000", KlineKind::Day, 60, Adjust::None)
        .await
        .unwrap();
    assert!(!candles.is_empty());
    assert!(candles.len() <= 60);
    assert!(candles.windows(2).all(|w| w[0].time <= w[1].time));
}

#[tokio::test]
#[ignore] // 需要本地运行行情网关
async fn test_tdx_batch_and_search() {
    let provider = provider();

    let quotes = provider.batch_quotes(&["600000", "000001"]).await.unwrap();
    assert_eq!(quotes.len(), 2);

    let hits = provider.search("浦发").await.unwrap();
    assert!(hits.iter().any(|h| h.code == "600000"));
}
