//! Webhook 加签。

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use kanshi_core::notify::error::NotifyError;
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// base64(hmac_sha256(key, msg))
pub fn hmac_base64(key: &[u8], msg: &[u8]) -> Result<String, NotifyError> {
    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| NotifyError::Config(format!("invalid signing key: {}", e)))?;
    mac.update(msg);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// 钉钉加签：以密钥为 key，对 `"{毫秒时间戳}\n{密钥}"` 做 HMAC-SHA256
pub fn dingtalk_sign(timestamp_ms: i64, secret: &str) -> Result<String, NotifyError> {
    let payload = format!("{}\n{}", timestamp_ms, secret);
    hmac_base64(secret.as_bytes(), payload.as_bytes())
}

/// 飞书加签：以 `"{秒级时间戳}\n{密钥}"` 为 key，对空消息做 HMAC-SHA256
pub fn feishu_sign(timestamp_secs: i64, secret: &str) -> Result<String, NotifyError> {
    let key = format!("{}\n{}", timestamp_secs, secret);
    hmac_base64(key.as_bytes(), b"")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dingtalk_sign_vector() {
        assert_eq!(
            dingtalk_sign(1_700_000_000_000, "SECtest").unwrap(),
            "aZLLrriXgn05YbwaGR7knYsLeJADjr9NwLaNNKpxh4g="
        );
    }

    #[test]
    fn test_feishu_sign_vector() {
        assert_eq!(
            feishu_sign(1_700_000_000, "SECtest").unwrap(),
            "G7XpBpG8NgG02fJOAhX6FRAObIljmFoxVReo8I62pEk="
        );
    }
}
