//! # `kanshi-reasoning` - 推理服务客户端
//!
//! [`chat::ChatClient`] 通过 OpenAI 兼容的 `/chat/completions` 接口实现 `ReasoningService`。

pub mod chat;
