//! 技术指标计算。
//!
//! 输入为按时间升序排列的日 K 线与实时行情快照，输出带可选字段的 [`IndicatorSet`]。
//! 历史长度不足的指标直接省略。

use kanshi_core::analysis::entity::IndicatorSet;
use kanshi_core::market::entity::{Candle, Quote, amount_to_yuan, hands_to_shares, li_to_yuan};

/// RSI 周期
pub const RSI_PERIOD: usize = 14;
/// 波动率统计的收益率个数
pub const VOLATILITY_PERIOD: usize = 20;
/// 参与计算的均线周期
pub const MA_PERIODS: [usize; 4] = [5, 10, 20, 60];
/// 盘口力度统计的档位数
const BOOK_DEPTH: usize = 5;

#[allow(clippy::cast_precision_loss)] // 周期与序列长度都很小
fn count_f64(n: usize) -> f64 {
    n as f64
}

#[allow(clippy::cast_precision_loss)]
fn ratio(num: i64, den: i64) -> f64 {
    num as f64 / den as f64
}

/// # Summary
/// 计算完整的指标集合。
///
/// # Logic
/// 1. 由行情快照换算价格、涨跌幅、成交量与成交额。
/// 2. 计算内外盘比例与五档买卖力度比。
/// 3. 在日 K 线上计算 5/10/20/60 日均线、RSI(14) 与 20 日波动率，历史不足的省略。
///
/// # Arguments
/// * `quote` - 实时行情快照。
/// * `daily` - 升序日 K 线。
///
/// # Returns
/// 指标集合。
pub fn compute(quote: &Quote, daily: &[Candle]) -> IndicatorSet {
    let closes: Vec<f64> = daily.iter().map(Candle::close_yuan).collect();

    let change_percent = (quote.prev_close > 0).then(|| {
        ratio(quote.last - quote.prev_close, quote.prev_close) * 100.0
    });

    let [ma5, ma10, ma20, ma60] = MA_PERIODS.map(|p| sma(&closes, p));

    IndicatorSet {
        current_price: li_to_yuan(quote.last),
        open_price: li_to_yuan(quote.open),
        high_price: li_to_yuan(quote.high),
        low_price: li_to_yuan(quote.low),
        prev_close: li_to_yuan(quote.prev_close),
        change_percent,
        volume: hands_to_shares(quote.total_hands),
        amount: amount_to_yuan(quote.amount),
        outer_ratio: outer_ratio(quote),
        buy_sell_ratio: buy_sell_ratio(quote),
        ma5,
        ma10,
        ma20,
        ma60,
        rsi14: (closes.len() >= RSI_PERIOD).then(|| rsi(&closes, RSI_PERIOD)),
        volatility_20d: (closes.len() >= VOLATILITY_PERIOD)
            .then(|| volatility(&closes, VOLATILITY_PERIOD)),
    }
}

/// 外盘占内外盘总量的百分比
pub fn outer_ratio(quote: &Quote) -> Option<f64> {
    let total = quote.inner + quote.outer;
    (total > 0).then(|| ratio(quote.outer, total) * 100.0)
}

/// 买五档挂单总量 / 卖五档挂单总量
pub fn buy_sell_ratio(quote: &Quote) -> Option<f64> {
    if quote.bids.is_empty() || quote.asks.is_empty() {
        return None;
    }
    let bid: i64 = quote.bids.iter().take(BOOK_DEPTH).map(|l| l.size).sum();
    let ask: i64 = quote.asks.iter().take(BOOK_DEPTH).map(|l| l.size).sum();
    (ask > 0).then(|| ratio(bid, ask))
}

/// 最近 `period` 个收盘价的简单移动平均
pub fn sma(closes: &[f64], period: usize) -> Option<f64> {
    if period == 0 || closes.len() < period {
        return None;
    }
    let window = &closes[closes.len() - period..];
    Some(window.iter().sum::<f64>() / count_f64(period))
}

/// # Summary
/// 简化 RSI：最近 `period` 个收盘价变动的平均涨幅与平均跌幅之比。
///
/// # Logic
/// 1. 数据少于 `period + 1` 根时返回中性值 50。
/// 2. 累加最近 `period` 次收盘价变动中的涨幅与跌幅绝对值，各自除以 `period`。
/// 3. 平均跌幅为 0 时返回 100。
/// 4. `RSI = 100 - 100 / (1 + avgGain / avgLoss)`。
pub fn rsi(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 50.0;
    }

    let tail = &closes[closes.len() - period - 1..];
    let (gains, losses) = tail
        .windows(2)
        .map(|w| w[1] - w[0])
        .fold((0.0, 0.0), |(g, l), change| {
            if change > 0.0 {
                (g + change, l)
            } else {
                (g, l - change)
            }
        });

    let avg_gain = gains / count_f64(period);
    let avg_loss = losses / count_f64(period);
    if avg_loss == 0.0 {
        return 100.0;
    }

    let rs = avg_gain / avg_loss;
    100.0 - 100.0 / (1.0 + rs)
}

/// # Summary
/// 最近 `period` 个日收益率的总体标准差 (除以 N)。
///
/// # Logic
/// 1. 数据少于 `period + 1` 根时返回 0。
/// 2. 前一根收盘价为 0 的收益率记为 0。
pub fn volatility(closes: &[f64], period: usize) -> f64 {
    if period == 0 || closes.len() < period + 1 {
        return 0.0;
    }

    let tail = &closes[closes.len() - period - 1..];
    let returns: Vec<f64> = tail
        .windows(2)
        .map(|w| if w[0] != 0.0 { (w[1] - w[0]) / w[0] } else { 0.0 })
        .collect();

    let n = count_f64(period);
    let mean = returns.iter().sum::<f64>() / n;
    let variance = returns.iter().map(|r| (r - mean).powi(2)).sum::<f64>() / n;
    variance.sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kanshi_core::market::entity::PriceLevel;

    fn series(values: &[f64]) -> Vec<f64> {
        values.to_vec()
    }

    #[test]
    fn test_rsi_strictly_increasing_is_100() {
        let closes: Vec<f64> = (0..15).map(|i| 10.0 + f64::from(i) * 0.1).collect();
        assert_eq!(rsi(&closes, 14), 100.0);
    }

    #[test]
    fn test_rsi_short_history_is_neutral() {
        let closes: Vec<f64> = (0..14).map(|i| 10.0 + f64::from(i)).collect();
        assert_eq!(rsi(&closes, 14), 50.0);
        assert_eq!(rsi(&[], 14), 50.0);
    }

    #[test]
    fn test_rsi_mixed_moves() {
        // 7 次 +1, 7 次 -0.5 => RS = 2, RSI = 66.67
        let mut closes = vec![10.0];
        for i in 0..14 {
            let last = closes[closes.len() - 1];
            closes.push(if i % 2 == 0 { last + 1.0 } else { last - 0.5 });
        }
        let value = rsi(&closes, 14);
        assert!((value - 200.0 / 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_volatility_constant_series_is_zero() {
        let closes = vec![12.5; 21];
        assert_eq!(volatility(&closes, 20), 0.0);
    }

    #[test]
    fn test_volatility_requires_period_plus_one() {
        let closes = series(&[1.0, 2.0, 3.0]);
        assert_eq!(volatility(&closes, 20), 0.0);
    }

    #[test]
    fn test_volatility_population_std() {
        // 收益率依次为 +10%, -10%，均值 0，总体标准差 0.1
        let closes = series(&[100.0, 110.0, 99.0]);
        assert!((volatility(&closes, 2) - 0.1).abs() < 1e-12);
    }

    #[test]
    fn test_sma_uses_trailing_window() {
        let closes = series(&[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        assert_eq!(sma(&closes, 5), Some(4.0));
        assert_eq!(sma(&closes, 10), None);
    }

    fn candle(close_li: i64) -> Candle {
        Candle {
            time: chrono::Utc::now(),
            open: close_li,
            high: close_li,
            low: close_li,
            close: close_li,
            volume: 10,
            amount: 0.0,
        }
    }

    fn quote() -> Quote {
        Quote {
            code: "600000".to_string(),
            prev_close: 10_000,
            open: 10_050,
            high: 10_300,
            low: 9_900,
            last: 10_200,
            total_hands: 1_500,
            amount: 15_300_000.0,
            inner: 300,
            outer: 700,
            bids: vec![
                PriceLevel { price: 10_190, size: 300 },
                PriceLevel { price: 10_180, size: 300 },
            ],
            asks: vec![PriceLevel { price: 10_210, size: 200 }],
        }
    }

    #[test]
    fn test_compute_quote_fields() {
        let set = compute(&quote(), &[]);
        assert!((set.current_price - 10.2).abs() < 1e-9);
        assert!((set.prev_close - 10.0).abs() < 1e-9);
        assert!((set.change_percent.unwrap_or_default() - 2.0).abs() < 1e-9);
        assert_eq!(set.volume, 150_000);
        assert!((set.amount - 15_300.0).abs() < 1e-9);
        assert!((set.outer_ratio.unwrap_or_default() - 70.0).abs() < 1e-9);
        assert!((set.buy_sell_ratio.unwrap_or_default() - 3.0).abs() < 1e-9);
        assert_eq!(set.ma5, None);
        assert_eq!(set.rsi14, None);
        assert_eq!(set.volatility_20d, None);
    }

    #[test]
    fn test_compute_omits_fields_for_short_history() {
        let daily: Vec<Candle> = (0..12).map(|i| candle(10_000 + i * 10)).collect();
        let set = compute(&quote(), &daily);
        assert!(set.ma5.is_some());
        assert!(set.ma10.is_some());
        assert!(set.ma20.is_none());
        assert!(set.ma60.is_none());
        assert!(set.rsi14.is_none());
    }

    #[test]
    fn test_compute_full_history() {
        let daily: Vec<Candle> = (0..60).map(|i| candle(10_000 + i * 10)).collect();
        let set = compute(&quote(), &daily);
        // 最近 5 根收盘价: 10.55..10.59
        assert!((set.ma5.unwrap_or_default() - 10.57).abs() < 1e-9);
        assert!(set.ma60.is_some());
        assert_eq!(set.rsi14, Some(100.0));
        assert!(set.volatility_20d.unwrap_or_default() > 0.0);
    }

    #[test]
    fn test_empty_book_omits_ratio() {
        let mut q = quote();
        q.asks.clear();
        q.inner = 0;
        q.outer = 0;
        assert_eq!(buy_sell_ratio(&q), None);
        assert_eq!(outer_ratio(&q), None);
    }
}
