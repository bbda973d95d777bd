//! 分析提示词渲染。

use kanshi_core::analysis::entity::IndicatorSet;
use kanshi_core::common::Instrument;
use kanshi_core::market::entity::{Candle, PriceLevel, Quote, Tick, li_to_yuan};

/// 推理服务的固定角色描述
pub const SYSTEM_ROLE: &str = "你是一位专业的A股分析师，精通技术分析和市场研判。";

/// 趋势段展示的最近日 K 根数
const RECENT_DAYS: usize = 5;
/// 分时段展示的最近成交笔数
const RECENT_TICKS: usize = 5;

/// # Summary
/// 渲染一次分析所需的全部上下文。
pub struct PromptContext<'a> {
    pub instrument: &'a Instrument,
    pub quote: &'a Quote,
    pub indicators: &'a IndicatorSet,
    // 升序日 K
    pub daily: &'a [Candle],
    // 30 分钟 K 线条数
    pub intraday_len: usize,
    // 分时成交，获取失败时为 None
    pub ticks: Option<&'a [Tick]>,
    // 本地化后的分析时间
    pub analyzed_at: String,
}

fn opt_fixed(v: Option<f64>, digits: usize, suffix: &str) -> String {
    match v {
        Some(x) => format!("{:.*}{}", digits, x, suffix),
        None => "数据不足".to_string(),
    }
}

fn push_levels(out: &mut String, label: &str, levels: &[PriceLevel]) {
    if levels.is_empty() {
        out.push_str("- 无挂单数据\n");
        return;
    }
    for (i, level) in levels.iter().enumerate() {
        out.push_str(&format!(
            "- {}{}: {:.2}元 x {}股\n",
            label,
            i + 1,
            li_to_yuan(level.price),
            level.size
        ));
    }
}

/// # Summary
/// 生成结构化的分析提示词。
///
/// # Logic
/// 1. 基本信息与实时行情。
/// 2. 五档盘口。
/// 3. 技术指标，缺失项标注为数据不足。
/// 4. K 线概况、近 5 日收盘与最近分时成交 (若有)。
/// 5. 固定的 JSON 输出约定。
pub fn render(ctx: &PromptContext<'_>) -> String {
    let ind = ctx.indicators;
    let mut out = String::with_capacity(2048);

    out.push_str("# 股票技术分析任务\n\n");
    out.push_str("请根据以下数据对该股票进行技术分析，并给出明确的操作建议。\n\n");

    out.push_str("## 基本信息\n");
    out.push_str(&format!("- 股票代码: {}\n", ctx.instrument.code));
    out.push_str(&format!("- 股票名称: {}\n", ctx.instrument.name));
    out.push_str(&format!("- 分析时间: {}\n\n", ctx.analyzed_at));

    out.push_str("## 实时行情\n");
    out.push_str(&format!("- 当前价: {:.2}元\n", ind.current_price));
    out.push_str(&format!("- 开盘价: {:.2}元\n", ind.open_price));
    out.push_str(&format!("- 最高价: {:.2}元\n", ind.high_price));
    out.push_str(&format!("- 最低价: {:.2}元\n", ind.low_price));
    out.push_str(&format!("- 昨收价: {:.2}元\n", ind.prev_close));
    out.push_str(&format!("- 涨跌幅: {}\n", opt_fixed(ind.change_percent, 2, "%")));
    out.push_str(&format!("- 成交量: {}股\n", ind.volume));
    out.push_str(&format!("- 成交额: {:.2}万元\n", ind.amount / 10_000.0));
    out.push_str(&format!(
        "- 外盘占比: {} (越高说明主动买盘越强)\n",
        opt_fixed(ind.outer_ratio, 1, "%")
    ));
    out.push_str(&format!(
        "- 买卖盘比: {} (大于 1 说明买盘强于卖盘)\n\n",
        opt_fixed(ind.buy_sell_ratio, 2, "")
    ));

    out.push_str("## 五档盘口\n买盘:\n");
    push_levels(&mut out, "买", &ctx.quote.bids);
    out.push_str("卖盘:\n");
    push_levels(&mut out, "卖", &ctx.quote.asks);

    out.push_str("\n## 技术指标\n");
    out.push_str(&format!("- MA5: {}\n", opt_fixed(ind.ma5, 2, "元")));
    out.push_str(&format!("- MA10: {}\n", opt_fixed(ind.ma10, 2, "元")));
    out.push_str(&format!("- MA20: {}\n", opt_fixed(ind.ma20, 2, "元")));
    out.push_str(&format!("- MA60: {}\n", opt_fixed(ind.ma60, 2, "元")));
    out.push_str(&format!("- RSI(14): {}\n", opt_fixed(ind.rsi14, 2, "")));
    out.push_str(&format!(
        "- 近20日波动率: {}\n\n",
        opt_fixed(ind.volatility_20d.map(|v| v * 100.0), 2, "%")
    ));

    out.push_str("## K线概况\n");
    out.push_str(&format!("- 日K线: 最近 {} 个交易日\n", ctx.daily.len()));
    out.push_str(&format!("- 30分钟K线: 最近 {} 条\n", ctx.intraday_len));

    if ctx.daily.len() >= RECENT_DAYS {
        out.push_str("\n近5日收盘 (由新到旧):\n");
        for candle in ctx.daily.iter().rev().take(RECENT_DAYS) {
            out.push_str(&format!(
                "- {}: {:.2}元 (成交量 {}手)\n",
                candle.time.format("%m-%d"),
                candle.close_yuan(),
                candle.volume
            ));
        }
    }

    if let Some(ticks) = ctx.ticks.filter(|t| !t.is_empty()) {
        out.push_str(&format!("\n## 分时成交 (共 {} 笔，最近 {} 笔)\n", ticks.len(), RECENT_TICKS));
        let skip = ticks.len().saturating_sub(RECENT_TICKS);
        for tick in &ticks[skip..] {
            out.push_str(&format!(
                "- {}: {:.2}元 x {}手\n",
                tick.time,
                li_to_yuan(tick.price),
                tick.volume
            ));
        }
    }

    out.push_str(OUTPUT_CONTRACT);
    out
}

const OUTPUT_CONTRACT: &str = r#"
## 分析要点
1. 趋势: 价格与均线的位置关系，上升、下降还是盘整
2. 量价: 成交量变化是否配合价格走势
3. 盘口: 买卖力量对比
4. 指标: RSI 是否超买超卖，均线排列
5. 风险: 当前位置的收益风险比

## 输出格式
只输出一个 JSON 对象，不要输出其他文字:

```json
{
  "signal": "BUY | SELL | HOLD",
  "confidence": 0-100 的整数,
  "reasoning": "分析理由，包含关键指标与逻辑",
  "target_price": 目标价 (元，数字，SELL/HOLD 可为 0),
  "stop_loss": 止损价 (元，数字，HOLD 可为 0),
  "risk_reward": "收益风险比，例如 1:2"
}
```

约束:
- signal 只能是 BUY、SELL、HOLD 之一
- BUY 必须同时给出 target_price 与 stop_loss
- SELL 应给出止损建议
- HOLD 需说明观望原因
"#;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn instrument() -> Instrument {
        Instrument {
            code: "600000".to_string(),
            name: "浦发银行".to_string(),
            enabled: true,
            scan_interval: Duration::from_secs(300),
            min_confidence: 70,
        }
    }

    #[test]
    fn test_render_includes_identity_and_contract() {
        let inst = instrument();
        let quote = Quote {
            bids: vec![PriceLevel { price: 9_990, size: 12 }],
            ..Quote::default()
        };
        let ind = IndicatorSet {
            current_price: 10.0,
            ma5: Some(9.87),
            ..IndicatorSet::default()
        };
        let text = render(&PromptContext {
            instrument: &inst,
            quote: &quote,
            indicators: &ind,
            daily: &[],
            intraday_len: 0,
            ticks: None,
            analyzed_at: "2025-03-10 10:00:00".to_string(),
        });

        assert!(text.contains("600000"));
        assert!(text.contains("浦发银行"));
        assert!(text.contains("- 买1: 9.99元 x 12股"));
        assert!(text.contains("MA5: 9.87元"));
        assert!(text.contains("MA60: 数据不足"));
        assert!(text.contains("- 无挂单数据"));
        for key in ["signal", "confidence", "reasoning", "target_price", "stop_loss", "risk_reward"] {
            assert!(text.contains(&format!("\"{}\"", key)));
        }
        assert!(!text.contains("分时成交"));
    }
}
