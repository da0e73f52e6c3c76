//! 验证码投递
//!
//! 本库只定义投递接口，不包含真正的邮件/短信发送。实际发送应由应用层
//! 接入第三方服务（SMTP、短信网关等）实现 [`DeliverySender`]。
//!
//! ## 示例
//!
//! ```rust
//! use async_trait::async_trait;
//! use otpkit::delivery::{DeliveryError, DeliveryMethod, DeliverySender};
//!
//! struct SmsGateway;
//!
//! #[async_trait]
//! impl DeliverySender for SmsGateway {
//!     async fn send(
//!         &self,
//!         contact: &str,
//!         method: DeliveryMethod,
//!         code: &str,
//!     ) -> Result<(), DeliveryError> {
//!         if method != DeliveryMethod::Sms {
//!             return Err(DeliveryError::UnsupportedMethod(method));
//!         }
//!         // gateway.send(contact, format!("Your code is {}", code)).await
//!         let _ = (contact, code);
//!         Ok(())
//!     }
//! }
//! ```

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use crate::contact::mask_contact;
use crate::error::ValidationError;

// ============================================================================
// 投递渠道
// ============================================================================

/// 投递渠道
///
/// 同一联系方式在不同渠道下的 OTP 相互独立。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryMethod {
    /// 邮件
    Email,
    /// 短信
    Sms,
}

impl DeliveryMethod {
    /// 渠道名称（`email` / `sms`）
    pub fn as_str(&self) -> &'static str {
        match self {
            DeliveryMethod::Email => "email",
            DeliveryMethod::Sms => "sms",
        }
    }
}

impl fmt::Display for DeliveryMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DeliveryMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(DeliveryMethod::Email),
            "sms" => Ok(DeliveryMethod::Sms),
            other => Err(ValidationError::InvalidMethod(other.to_string())),
        }
    }
}

// ============================================================================
// 投递错误
// ============================================================================

/// 投递失败原因
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeliveryError {
    /// 服务商拒绝（号码无效、被拉黑等）
    Rejected(String),
    /// 传输层失败（超时、连接失败等）
    Transport(String),
    /// 该发送器不支持此渠道
    UnsupportedMethod(DeliveryMethod),
}

impl fmt::Display for DeliveryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DeliveryError::Rejected(msg) => write!(f, "rejected by provider: {}", msg),
            DeliveryError::Transport(msg) => write!(f, "transport failure: {}", msg),
            DeliveryError::UnsupportedMethod(method) => {
                write!(f, "delivery method '{}' is not supported", method)
            }
        }
    }
}

impl std::error::Error for DeliveryError {}

// ============================================================================
// 发送接口
// ============================================================================

/// 验证码发送接口
///
/// `send` 可以挂起任意时长；`OtpService` 在其返回成功之后才写入记录。
#[async_trait]
pub trait DeliverySender: Send + Sync {
    /// 将验证码发送到指定联系方式
    async fn send(
        &self,
        contact: &str,
        method: DeliveryMethod,
        code: &str,
    ) -> Result<(), DeliveryError>;
}

#[async_trait]
impl<T: DeliverySender + ?Sized> DeliverySender for Arc<T> {
    async fn send(
        &self,
        contact: &str,
        method: DeliveryMethod,
        code: &str,
    ) -> Result<(), DeliveryError> {
        (**self).send(contact, method, code).await
    }
}

/// 模拟发送器
///
/// 不做真实投递，只在 `info` 级别记录一条日志，可选地模拟网络延迟。
/// 用于开发环境和演示。
#[derive(Debug, Clone, Default)]
pub struct SimulatedSender {
    latency: Option<Duration>,
}

impl SimulatedSender {
    /// 无延迟的模拟发送器
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置模拟延迟
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }
}

#[async_trait]
impl DeliverySender for SimulatedSender {
    async fn send(
        &self,
        contact: &str,
        method: DeliveryMethod,
        code: &str,
    ) -> Result<(), DeliveryError> {
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        tracing::info!(
            contact = %mask_contact(contact, method),
            %method,
            code_length = code.len(),
            "simulated OTP delivery"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_display() {
        assert_eq!(DeliveryMethod::Email.to_string(), "email");
        assert_eq!(DeliveryMethod::Sms.to_string(), "sms");
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("email".parse::<DeliveryMethod>(), Ok(DeliveryMethod::Email));
        assert_eq!(" SMS ".parse::<DeliveryMethod>(), Ok(DeliveryMethod::Sms));
        assert_eq!(
            "pigeon".parse::<DeliveryMethod>(),
            Err(ValidationError::InvalidMethod("pigeon".to_string()))
        );
    }

    #[test]
    fn test_method_serde() {
        let json = serde_json::to_string(&DeliveryMethod::Sms).unwrap();
        assert_eq!(json, "\"sms\"");
        let parsed: DeliveryMethod = serde_json::from_str("\"email\"").unwrap();
        assert_eq!(parsed, DeliveryMethod::Email);
    }

    #[test]
    fn test_delivery_error_display() {
        let err = DeliveryError::UnsupportedMethod(DeliveryMethod::Email);
        assert_eq!(err.to_string(), "delivery method 'email' is not supported");
    }

    #[tokio::test]
    async fn test_simulated_sender_succeeds() {
        let sender = SimulatedSender::new().with_latency(Duration::from_millis(5));
        let result = sender
            .send("user@example.com", DeliveryMethod::Email, "123456")
            .await;
        assert!(result.is_ok());
    }
}
