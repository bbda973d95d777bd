//! # `kanshi-manager` - 监控任务注册与调度
//!
//! 持有所有标的的分析流水线，驱动各自独立的周期调度，并为管理层提供查询与手动触发。

pub mod history;
pub mod monitor;
