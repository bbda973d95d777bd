//! # `kanshi-notify` - 通知渠道
//!
//! 钉钉、飞书 Webhook 机器人，Telegram 与邮件，以及并发分发的 [`multi::MultiNotifier`]。

pub mod dingtalk;
pub mod email;
pub mod feishu;
pub mod format;
pub mod multi;
pub mod sign;
pub mod telegram;
