//! 交易信号的文本渲染，供各渠道共用。

use chrono::{DateTime, FixedOffset, Utc};
use kanshi_core::analysis::entity::Signal;
use kanshi_core::notify::entity::TradingSignal;

/// 北京时间偏移
const CST_OFFSET_SECS: i32 = 8 * 3600;

pub fn emoji(signal: Signal) -> &'static str {
    match signal {
        Signal::Buy => "🟢",
        Signal::Sell => "🔴",
        Signal::Hold => "🟡",
    }
}

/// 标题，例如 `【BUY】浦发银行 600000`
pub fn title(s: &TradingSignal) -> String {
    format!("【{}】{} {}", s.signal, s.stock_name, s.stock_code)
}

/// 以北京时间格式化
pub fn local_time(t: DateTime<Utc>) -> String {
    match FixedOffset::east_opt(CST_OFFSET_SECS) {
        Some(tz) => t.with_timezone(&tz).format("%Y-%m-%d %H:%M:%S").to_string(),
        None => t.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    }
}

/// # Summary
/// 渲染 Markdown 正文。
///
/// # Logic
/// 1. 标题行带信号图标。
/// 2. 目标价、止损价与收益风险比仅在有值时输出。
/// 3. 附带分析理由与时间。
pub fn markdown(s: &TradingSignal) -> String {
    let mut out = format!(
        "# {} {}信号 - {}({})\n\n---\n\n",
        emoji(s.signal),
        s.signal,
        s.stock_name,
        s.stock_code
    );
    out.push_str(&format!("**当前价格**: {:.2}元\n\n", s.price));
    out.push_str(&format!("**信心度**: {}%\n\n", s.confidence));
    if s.target_price > 0.0 {
        out.push_str(&format!("**目标价格**: {:.2}元\n\n", s.target_price));
    }
    if s.stop_loss > 0.0 {
        out.push_str(&format!("**止损价格**: {:.2}元\n\n", s.stop_loss));
    }
    if !s.risk_reward.is_empty() {
        out.push_str(&format!("**风险回报比**: {}\n\n", s.risk_reward));
    }
    out.push_str(&format!("---\n\n**分析原因**:\n\n{}\n\n---\n\n", s.reasoning));
    out.push_str(&format!("**时间**: {}\n", local_time(s.timestamp)));
    out
}

/// 纯文本正文，用于邮件
pub fn plain(s: &TradingSignal) -> String {
    let mut out = format!("{} {} 信心度 {}%\n", title(s), emoji(s.signal), s.confidence);
    out.push_str(&format!("当前价格: {:.2}元\n", s.price));
    if s.target_price > 0.0 {
        out.push_str(&format!("目标价格: {:.2}元\n", s.target_price));
    }
    if s.stop_loss > 0.0 {
        out.push_str(&format!("止损价格: {:.2}元\n", s.stop_loss));
    }
    if !s.risk_reward.is_empty() {
        out.push_str(&format!("风险回报比: {}\n", s.risk_reward));
    }
    out.push_str(&format!("\n分析原因:\n{}\n\n时间: {}\n", s.reasoning, local_time(s.timestamp)));
    out
}
