//! # `kanshi-api` - HTTP 管理接口
//!
//! 本 crate 是监控服务的 HTTP/REST 入口。
//! 使用 `axum` 构建路由与控制器，通过 `utoipa` 自动生成 OpenAPI 3.0 Swagger 文档。
//!
//! ## 架构职责
//! - 查询监控标的、最新结果与历史
//! - 手动触发单个标的的分析周期
//! - 暴露运行统计与交易时间状态

pub mod error;
pub mod routes;
pub mod server;
pub mod types;
