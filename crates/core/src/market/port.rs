use crate::common::{Adjust, KlineKind};
use crate::market::entity::{Candle, Quote, SearchHit, Tick};
use crate::market::error::MarketError;
use async_trait::async_trait;
use chrono::NaiveDate;

/// # Summary
/// 行情数据源接口。
///
/// # Invariants
/// - 返回的 K 线序列严格按时间升序排列，最旧的在前。
/// - 实现者不做重试，失败直接返回 `MarketError`，由下一次调度自然重试。
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// # Summary
    /// 获取证券的实时五档行情。
    ///
    /// # Arguments
    /// * `code`: 证券代码。
    ///
    /// # Returns
    /// 成功返回行情快照。
    async fn get_quote(&self, code: &str) -> Result<Quote, MarketError>;

    /// # Summary
    /// 获取指定周期的最近 `limit` 根 K 线。
    ///
    /// # Logic
    /// 1. 按周期与复权方式请求数据。
    /// 2. 仅保留最新的 `limit` 条 (而不是最旧的)。
    ///
    /// # Arguments
    /// * `code`: 证券代码。
    /// * `kind`: K 线周期。
    /// * `limit`: 数量上限，0 表示不截断。
    /// * `adjust`: 复权方式。
    ///
    /// # Returns
    /// 成功返回升序 K 线列表。
    async fn get_candles(
        &self,
        code: &str,
        kind: KlineKind,
        limit: usize,
        adjust: Adjust,
    ) -> Result<Vec<Candle>, MarketError>;

    /// # Summary
    /// 获取分时成交数据。
    ///
    /// # Arguments
    /// * `code`: 证券代码。
    /// * `date`: 可选日期，None 表示当日。
    async fn get_ticks(&self, code: &str, date: Option<NaiveDate>)
    -> Result<Vec<Tick>, MarketError>;

    /// 按关键字搜索证券。
    async fn search(&self, keyword: &str) -> Result<Vec<SearchHit>, MarketError>;
}
