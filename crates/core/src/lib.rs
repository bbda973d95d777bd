//! # `kanshi-core` - 领域契约层
//!
//! 定义监控系统所有跨 crate 共享的实体、端口 (Trait) 与错误枚举。
//! 本 crate 不包含任何 I/O 实现，具体实现由上层 crate 通过构造函数注入。

pub mod config;

pub mod common {
    mod instrument;
    pub mod time;

    pub use instrument::{Adjust, Instrument, KlineKind};
}

pub mod market {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod reasoning {
    pub mod error;
    pub mod port;
}

pub mod notify {
    pub mod entity;
    pub mod error;
    pub mod port;
}

pub mod analysis {
    pub mod entity;
    pub mod error;
}

#[cfg(feature = "test-utils")]
pub mod test_utils;
