use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use kanshi_core::common::{Adjust, KlineKind};
use kanshi_core::market::entity::{Candle, PriceLevel, Quote, SearchHit, Tick};
use kanshi_core::market::error::MarketError;
use kanshi_core::market::port::MarketDataSource;
use reqwest::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// 默认请求超时
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// # Summary
/// 通达信 HTTP 行情网关提供者。
///
/// # Invariants
/// - 使用 `reqwest` 异步客户端进行通讯。
/// - 价格单位为厘，成交量单位为手，与网关保持一致，不做换算。
#[derive(Clone)]
pub struct TdxProvider {
    // 内部使用的 HTTP 客户端
    client: Client,
    // 网关根地址，不带末尾斜杠
    base_url: String,
}

impl TdxProvider {
    /// # Summary
    /// 创建一个新的 TdxProvider 实例。
    ///
    /// # Logic
    /// 1. 去掉根地址末尾的斜杠。
    /// 2. 以指定超时初始化 reqwest 客户端。
    ///
    /// # Arguments
    /// * `base_url`: 网关根地址，例如 `http://localhost:8080`。
    /// * `timeout`: 单次请求超时。
    ///
    /// # Returns
    /// 客户端构建失败时返回 `MarketError::Network`。
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, MarketError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| MarketError::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    /// # Summary
    /// 发起 GET 请求并解出响应信封中的数据。
    ///
    /// # Logic
    /// 1. 拼接路径与查询参数并发送请求。
    /// 2. 非 2xx 状态码视为网络错误。
    /// 3. 解析信封，`code != 0` 视为网关业务错误。
    async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, MarketError> {
        let url = format!("{}{}", self.base_url, path);
        debug!(url = %url, ?query, "tdx request");

        let resp = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(MarketError::Network(format!("HTTP {}", resp.status())));
        }

        let body = resp
            .text()
            .await
            .map_err(|e| MarketError::Network(e.to_string()))?;
        decode(&body)
    }

    /// # Summary
    /// 批量获取行情快照。
    ///
    /// # Arguments
    /// * `codes`: 证券代码列表，以逗号拼接后一次请求。
    ///
    /// # Returns
    /// 网关返回的全部行情，顺序与网关一致。
    pub async fn batch_quotes(&self, codes: &[&str]) -> Result<Vec<Quote>, MarketError> {
        if codes.is_empty() {
            return Ok(Vec::new());
        }
        let joined = codes.join(",");
        let quotes: Vec<TdxQuote> = self.get("/api/quote", &[("code", joined.as_str())]).await?;
        Ok(quotes.into_iter().map(Quote::from).collect())
    }
}

/// # Summary
/// 网关响应信封。
#[derive(Deserialize, Debug)]
struct Envelope {
    code: i64,
    #[serde(default)]
    message: String,
    #[serde(default)]
    data: serde_json::Value,
}

fn decode<T: DeserializeOwned>(body: &str) -> Result<T, MarketError> {
    let envelope: Envelope =
        serde_json::from_str(body).map_err(|e| MarketError::Parse(e.to_string()))?;
    if envelope.code != 0 {
        return Err(MarketError::Api(envelope.message));
    }
    serde_json::from_value(envelope.data).map_err(|e| MarketError::Parse(e.to_string()))
}

/// # Summary
/// 网关原始行情结构。
#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct TdxQuote {
    code: String,
    #[serde(rename = "K")]
    k: TdxBar,
    #[serde(default)]
    total_hand: i64,
    #[serde(default)]
    amount: f64,
    #[serde(default)]
    inside_dish: i64,
    #[serde(default)]
    outer_disc: i64,
    #[serde(default)]
    buy_level: Vec<TdxLevel>,
    #[serde(default)]
    sell_level: Vec<TdxLevel>,
}

/// # Summary
/// 行情中的当日价格，`Last` 为昨收。
#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct TdxBar {
    last: i64,
    open: i64,
    high: i64,
    low: i64,
    close: i64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct TdxLevel {
    price: i64,
    number: i64,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct TdxKlines {
    #[serde(default)]
    list: Vec<TdxKline>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct TdxKline {
    open: i64,
    high: i64,
    low: i64,
    close: i64,
    #[serde(default)]
    volume: i64,
    #[serde(default)]
    amount: f64,
    time: DateTime<Utc>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct TdxMinutes {
    #[serde(default)]
    list: Vec<TdxMinute>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct TdxMinute {
    time: String,
    price: i64,
    number: i64,
}

impl From<TdxLevel> for PriceLevel {
    fn from(l: TdxLevel) -> Self {
        Self {
            price: l.price,
            size: l.number,
        }
    }
}

impl From<TdxQuote> for Quote {
    fn from(q: TdxQuote) -> Self {
        Self {
            code: q.code,
            prev_close: q.k.last,
            open: q.k.open,
            high: q.k.high,
            low: q.k.low,
            last: q.k.close,
            total_hands: q.total_hand,
            amount: q.amount,
            inner: q.inside_dish,
            outer: q.outer_disc,
            bids: q.buy_level.into_iter().map(PriceLevel::from).collect(),
            asks: q.sell_level.into_iter().map(PriceLevel::from).collect(),
        }
    }
}

impl From<TdxKline> for Candle {
    fn from(k: TdxKline) -> Self {
        Self {
            time: k.time,
            open: k.open,
            high: k.high,
            low: k.low,
            close: k.close,
            volume: k.volume,
            amount: k.amount,
        }
    }
}

/// 仅保留最新的 `limit` 条，0 表示不截断
fn keep_latest<T>(mut rows: Vec<T>, limit: usize) -> Vec<T> {
    if limit > 0 && rows.len() > limit {
        rows.drain(..rows.len() - limit);
    }
    rows
}

#[async_trait]
impl MarketDataSource for TdxProvider {
    async fn get_quote(&self, code: &str) -> Result<Quote, MarketError> {
        let quotes: Vec<TdxQuote> = self.get("/api/quote", &[("code", code)]).await?;
        quotes
            .into_iter()
            .next()
            .map(Quote::from)
            .ok_or(MarketError::NotFound)
    }

    /// # Summary
    /// 拉取 K 线并保留最新的 `limit` 根。
    ///
    /// # Logic
    /// 1. 周期与复权方式映射为网关参数。
    /// 2. 网关返回升序全量数据，截取尾部。
    async fn get_candles(
        &self,
        code: &str,
        kind: KlineKind,
        limit: usize,
        adjust: Adjust,
    ) -> Result<Vec<Candle>, MarketError> {
        let data: TdxKlines = self
            .get(
                "/api/kline",
                &[
                    ("code", code),
                    ("type", kind.as_param()),
                    ("adjust", adjust.as_param()),
                ],
            )
            .await?;
        let candles = data.list.into_iter().map(Candle::from).collect();
        Ok(keep_latest(candles, limit))
    }

    async fn get_ticks(
        &self,
        code: &str,
        date: Option<NaiveDate>,
    ) -> Result<Vec<Tick>, MarketError> {
        let date_param = date.map(|d| d.format("%Y%m%d").to_string());
        let mut query = vec![("code", code)];
        if let Some(d) = date_param.as_deref() {
            query.push(("date", d));
        }

        let data: TdxMinutes = self.get("/api/minute", &query).await?;
        Ok(data
            .list
            .into_iter()
            .map(|m| Tick {
                time: m.time,
                price: m.price,
                volume: m.number,
            })
            .collect())
    }

    async fn search(&self, keyword: &str) -> Result<Vec<SearchHit>, MarketError> {
        #[derive(Deserialize)]
        struct Hit {
            code: String,
            name: String,
        }

        let hits: Vec<Hit> = self.get("/api/search", &[("keyword", keyword)]).await?;
        Ok(hits
            .into_iter()
            .map(|h| SearchHit {
                code: h.code,
                name: h.name,
            })
            .collect())
    }
}
