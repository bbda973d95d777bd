//! 推理服务文本的决策提取与校验。
//!
//! 提取由一组有序的 [`Extractor`] 完成，第一个产出 JSON 对象的策略胜出。
//! 解码后的决策经过规范化 (信号大小写、信心度截断) 与语义校验。

use kanshi_core::analysis::entity::{Decision, Signal};
use kanshi_core::analysis::error::DecisionError;
use serde::Deserialize;
use serde_json::Value;

/// 解析失败时合成 HOLD 决策的信心度
pub const FALLBACK_CONFIDENCE: u8 = 30;
/// BUY 信号建议的最低收益风险比
pub const MIN_REWARD_RISK: f64 = 1.5;
/// 低于此信心度的方向性信号给出提示
pub const LOW_CONFIDENCE: u8 = 50;

/// # Summary
/// 单一的文本提取策略。
///
/// # Invariants
/// - 只负责从原始文本中切出候选片段，不做 JSON 解码。
pub trait Extractor: Send + Sync {
    /// 策略名称，用于日志
    fn name(&self) -> &'static str;

    /// 尝试切出候选 JSON 文本
    fn extract<'a>(&self, text: &'a str) -> Option<&'a str>;
}

/// 标注为 json 的围栏代码块: ```json { ... } ```
pub struct FencedJsonBlock;

impl Extractor for FencedJsonBlock {
    fn name(&self) -> &'static str {
        "fenced-json-block"
    }

    fn extract<'a>(&self, text: &'a str) -> Option<&'a str> {
        const OPEN: &str = "```json";
        const FENCE: &str = "```";

        let mut rest = text;
        while let Some(pos) = rest.find(OPEN) {
            let body = &rest[pos + OPEN.len()..];
            let trimmed = body.trim_start();
            if trimmed.starts_with('{') {
                if let Some(close) = trimmed.find(FENCE) {
                    let candidate = trimmed[..close].trim_end();
                    if candidate.ends_with('}') {
                        return Some(candidate);
                    }
                }
            }
            rest = body;
        }
        None
    }
}

/// 文本中第一个包含 `"signal"` 键且不含嵌套花括号的对象
pub struct SignalObject;

impl Extractor for SignalObject {
    fn name(&self) -> &'static str {
        "signal-object"
    }

    fn extract<'a>(&self, text: &'a str) -> Option<&'a str> {
        for (start, _) in text.match_indices('{') {
            let tail = &text[start + 1..];
            let Some(end) = tail.find(['{', '}']) else {
                break;
            };
            if tail[end..].starts_with('}') {
                let candidate = &text[start..start + 1 + end + 1];
                if candidate.contains("\"signal\"") {
                    return Some(candidate);
                }
            }
        }
        None
    }
}

/// 整段文本本身即为 JSON 对象
pub struct WholeText;

impl Extractor for WholeText {
    fn name(&self) -> &'static str {
        "whole-text"
    }

    fn extract<'a>(&self, text: &'a str) -> Option<&'a str> {
        let trimmed = text.trim();
        (!trimmed.is_empty()).then_some(trimmed)
    }
}

/// 按优先级排列的默认提取链
pub fn default_extractors() -> [&'static dyn Extractor; 3] {
    [&FencedJsonBlock, &SignalObject, &WholeText]
}

/// 推理服务输出的原始决策结构，缺失字段与 `null` 均视为零值
#[derive(Debug, Deserialize)]
struct RawDecision {
    #[serde(default)]
    signal: Option<String>,
    #[serde(default)]
    confidence: Option<Value>,
    #[serde(default)]
    reasoning: Option<String>,
    #[serde(default)]
    target_price: Option<f64>,
    #[serde(default)]
    stop_loss: Option<f64>,
    #[serde(default)]
    risk_reward: Option<Value>,
}

/// 将任意整数信心度截断到 [0, 100]
pub fn clamp_confidence(raw: i64) -> u8 {
    u8::try_from(raw.clamp(0, 100)).unwrap_or(100)
}

#[allow(clippy::cast_possible_truncation)] // 已在 f64 域内截断到 [0, 100]
fn confidence_from_value(value: Option<&Value>) -> u8 {
    match value {
        Some(Value::Number(n)) => match n.as_i64() {
            Some(i) => clamp_confidence(i),
            None => clamp_confidence(n.as_f64().map_or(0.0, |f| f.round().clamp(0.0, 100.0)) as i64),
        },
        Some(Value::String(s)) => s.trim().parse::<i64>().map_or(0, clamp_confidence),
        _ => 0,
    }
}

fn risk_reward_text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Null) | None => String::new(),
        Some(other) => other.to_string(),
    }
}

/// # Summary
/// 使用指定提取链解析推理服务文本。
///
/// # Logic
/// 1. 依次运行提取器，第一个切出合法 JSON 对象的结果胜出。
/// 2. 解码为原始决策结构。
/// 3. 信号去空白转大写，非 BUY/SELL/HOLD 返回 `Parse`。
/// 4. 信心度截断到 [0, 100]。
/// 5. BUY 缺少目标价或止损价返回 `Validation`。
pub fn parse_with(extractors: &[&dyn Extractor], text: &str) -> Result<Decision, DecisionError> {
    let object = extractors
        .iter()
        .filter_map(|e| e.extract(text).map(|c| (e.name(), c)))
        .find_map(|(name, candidate)| match serde_json::from_str::<Value>(candidate) {
            Ok(v @ Value::Object(_)) => {
                tracing::debug!(extractor = name, "decision object extracted");
                Some(v)
            }
            _ => None,
        })
        .ok_or_else(|| DecisionError::Parse("no JSON decision object found".to_string()))?;

    let raw: RawDecision = serde_json::from_value(object)
        .map_err(|e| DecisionError::Parse(format!("failed to decode decision: {}", e)))?;

    let raw_signal = raw.signal.unwrap_or_default();
    if raw_signal.trim().is_empty() {
        return Err(DecisionError::Parse("missing signal field".to_string()));
    }
    let signal: Signal = raw_signal.parse().map_err(DecisionError::Parse)?;

    let decision = Decision {
        signal,
        confidence: confidence_from_value(raw.confidence.as_ref()),
        reasoning: raw.reasoning.unwrap_or_default(),
        target_price: raw.target_price.unwrap_or_default(),
        stop_loss: raw.stop_loss.unwrap_or_default(),
        risk_reward: risk_reward_text(raw.risk_reward),
    };

    if decision.signal == Signal::Buy {
        if decision.target_price == 0.0 {
            return Err(DecisionError::Validation("BUY signal requires target_price".to_string()));
        }
        if decision.stop_loss == 0.0 {
            return Err(DecisionError::Validation("BUY signal requires stop_loss".to_string()));
        }
    }

    Ok(decision)
}

/// 使用默认提取链解析
pub fn parse(text: &str) -> Result<Decision, DecisionError> {
    parse_with(&default_extractors(), text)
}

/// # Summary
/// 对决策做价格合理性检查，只产生提示不阻断。
///
/// # Logic
/// 1. BUY: 目标价应高于现价，止损价应低于现价，收益风险比不低于 1.5。
/// 2. SELL: 若设置了止损价，应高于现价。
/// 3. 方向性信号信心度低于 50 时提示谨慎。
pub fn validate(decision: &Decision, current_price: f64) -> Vec<String> {
    let mut warnings = Vec::new();
    let (target, stop) = (decision.target_price, decision.stop_loss);

    match decision.signal {
        Signal::Buy => {
            if target <= current_price {
                warnings.push(format!(
                    "目标价 {:.2} 未高于当前价 {:.2}",
                    target, current_price
                ));
            }
            if stop >= current_price {
                warnings.push(format!(
                    "止损价 {:.2} 未低于当前价 {:.2}",
                    stop, current_price
                ));
            }
            if target > current_price && stop < current_price {
                let ratio = (target - current_price) / (current_price - stop);
                if ratio < MIN_REWARD_RISK {
                    warnings.push(format!(
                        "收益风险比 {:.2} 偏低，建议至少 1:{}",
                        ratio, MIN_REWARD_RISK
                    ));
                }
            }
        }
        Signal::Sell => {
            if stop > 0.0 && stop <= current_price {
                warnings.push(format!(
                    "SELL 信号的止损价 {:.2} 应高于当前价 {:.2}",
                    stop, current_price
                ));
            }
        }
        Signal::Hold => {}
    }

    if decision.signal.is_directional() && decision.confidence < LOW_CONFIDENCE {
        warnings.push(format!("信心度 {}% 偏低，谨慎操作", decision.confidence));
    }

    warnings
}

/// 将校验提示追加到分析理由末尾
pub fn append_warnings(decision: &mut Decision, warnings: &[String]) {
    if warnings.is_empty() {
        return;
    }
    decision.reasoning.push_str("\n\n【系统提示】\n");
    decision.reasoning.push_str(&warnings.join("\n"));
}

/// 无法解析时的保守决策，原样保留推理服务的响应
pub fn fallback_hold(raw_response: &str) -> Decision {
    Decision {
        signal: Signal::Hold,
        confidence: FALLBACK_CONFIDENCE,
        reasoning: format!("AI 响应解析失败，建议观望。原始响应: {}", raw_response),
        target_price: 0.0,
        stop_loss: 0.0,
        risk_reward: String::new(),
    }
}
