use crate::format;
use async_trait::async_trait;
use kanshi_core::notify::entity::TradingSignal;
use kanshi_core::notify::error::NotifyError;
use kanshi_core::notify::port::Notifier;
use lettre::message::{Mailbox, Message, header::ContentType};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Tokio1Executor};

/// # Summary
/// 通过 SMTP 发送邮件的通知器 (如 QQ 邮箱、Gmail)。
///
/// # Invariants
/// - 收发地址在构造时解析，发送时不再失败于地址格式。
/// - `AsyncSmtpTransport` 在多次通知间复用。
pub struct EmailNotifier {
    mailer: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailNotifier {
    /// # Summary
    /// 创建 EmailNotifier。
    ///
    /// # Logic
    /// 1. 解析收发地址。
    /// 2. 以 STARTTLS 587 端口配置中继与认证。
    ///
    /// # Arguments
    /// * `host` - SMTP 服务器 (例如 "smtp.qq.com")。
    /// * `user` - SMTP 用户名。
    /// * `pass` - SMTP 密码或授权码。
    /// * `from` - 发件地址。
    /// * `to` - 收件地址。
    pub fn new(host: &str, user: &str, pass: &str, from: &str, to: &str) -> Result<Self, NotifyError> {
        let from: Mailbox = from
            .parse()
            .map_err(|e| NotifyError::Config(format!("Invalid from address: {}", e)))?;
        let to: Mailbox = to
            .parse()
            .map_err(|e| NotifyError::Config(format!("Invalid to address: {}", e)))?;

        let creds = Credentials::new(user.to_string(), pass.to_string());
        let mailer = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| NotifyError::Config(format!("Invalid SMTP host: {}", e)))?
            .credentials(creds)
            .build();

        Ok(Self { mailer, from, to })
    }

    async fn deliver(&self, subject: &str, body: String) -> Result<(), NotifyError> {
        let email = Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(subject)
            .header(ContentType::TEXT_PLAIN)
            .body(body)
            .map_err(|e| NotifyError::Platform(format!("Failed to build email: {}", e)))?;

        self.mailer
            .send(email)
            .await
            .map_err(|e| NotifyError::Network(format!("SMTP error: {}", e)))?;

        Ok(())
    }
}

#[async_trait]
impl Notifier for EmailNotifier {
    async fn send_signal(&self, signal: &TradingSignal) -> Result<(), NotifyError> {
        self.deliver(&format::title(signal), format::plain(signal)).await
    }

    async fn send_message(&self, message: &str) -> Result<(), NotifyError> {
        self.deliver("Kanshi 通知", message.to_string()).await
    }
}
