//! # `kanshi-feed` - 行情数据源
//!
//! [`tdx::TdxProvider`] 通过通达信 HTTP 网关实现 `MarketDataSource`。

pub mod tdx;
