//! # 路由控制器
//!
//! - [`stock`]: 标的列表、最新结果、历史与手动分析
//! - [`system`]: 健康检查、运行统计与交易时间状态

pub mod stock;
pub mod system;
