//! # otpkit
//!
//! 面向邮箱/手机号验证的一次性验证码 (OTP) 库。
//!
//! ## 功能特性
//!
//! - **签发**: 生成固定位数的数字验证码，经可替换的发送器投递
//! - **验证**: 按 `(contact, method)` 存储，惰性过期、尝试次数上限、常量时间比较
//! - **重发冷却**: 可选的同键最小签发间隔
//! - **审计日志**: 记录签发、验证、锁定、过期等安全事件
//! - **联系方式工具**: 邮箱/手机号格式检查与日志脱敏
//!
//! 本库不包含真正的邮件/短信发送，也不做持久化；实现
//! [`DeliverySender`] 与 [`OtpStore`] 即可接入自己的基础设施。
//!
//! ## 示例
//!
//! ```rust
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use otpkit::{DeliveryMethod, OtpConfig, OtpResponse, OtpService};
//!
//! let service = OtpService::new(OtpConfig::default()).unwrap();
//!
//! // 签发（默认使用模拟发送器）
//! let response = OtpResponse::from(service.issue("user@example.com", DeliveryMethod::Email).await);
//! assert!(response.success);
//! assert_eq!(response.message, "OTP sent successfully via email");
//!
//! // 验证用户输入
//! let response = OtpResponse::from(
//!     service
//!         .verify("user@example.com", DeliveryMethod::Email, "not-the-code")
//!         .await,
//! );
//! assert!(!response.success);
//! assert_eq!(response.message, "Invalid OTP. 2 attempts remaining");
//! # });
//! ```
//!
//! ## 可控的时间与验证码
//!
//! ```rust
//! # tokio::runtime::Runtime::new().unwrap().block_on(async {
//! use otpkit::clock::ManualClock;
//! use otpkit::otp::FixedCodeGenerator;
//! use otpkit::{DeliveryMethod, OtpError, OtpService};
//! use std::time::Duration;
//!
//! let clock = ManualClock::at_epoch();
//! let service = OtpService::builder()
//!     .clock(clock.clone())
//!     .generator(FixedCodeGenerator::new("123456"))
//!     .build()
//!     .unwrap();
//!
//! service.issue("+15551234567", DeliveryMethod::Sms).await.unwrap();
//! clock.advance(Duration::from_millis(300_001));
//!
//! let err = service
//!     .verify("+15551234567", DeliveryMethod::Sms, "123456")
//!     .await
//!     .unwrap_err();
//! assert_eq!(err.as_otp(), Some(&OtpError::Expired));
//! # });
//! ```

pub mod audit;
pub mod clock;
pub mod contact;
pub mod delivery;
pub mod error;
pub mod otp;
pub mod random;

pub use error::{Error, OtpError, Result};

// ============================================================================
// OTP 相关导出
// ============================================================================

pub use otp::{
    InMemoryOtpStore, IssuedOtp, OtpConfig, OtpResponse, OtpService, OtpServiceBuilder,
    OtpSettings, OtpState, OtpStatus, OtpStore, ReverifyPolicy, Verification,
};

// ============================================================================
// 协作者导出
// ============================================================================

pub use clock::{Clock, ManualClock, SystemClock};
pub use delivery::{DeliveryError, DeliveryMethod, DeliverySender, SimulatedSender};

// ============================================================================
// 审计导出
// ============================================================================

pub use audit::{AuditLogger, EventSeverity, EventType, InMemoryAuditLogger, SecurityEvent};
