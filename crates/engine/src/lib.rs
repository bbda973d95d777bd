//! # `kanshi-engine` - 分析引擎
//!
//! 单个标的一次完整分析周期所需的全部算法：
//! - [`calendar`]: 交易日历闸门
//! - [`indicator`]: 技术指标计算
//! - [`decision`]: 推理文本的决策提取与校验
//! - [`prompt`]: 提示词渲染
//! - [`pipeline`]: 将上述组件与注入的外部协作者串联成一个周期

pub mod calendar;
pub mod decision;
pub mod indicator;
pub mod pipeline;
pub mod prompt;
