//! 统一错误类型模块
//!
//! 提供 otpkit 库中所有操作的错误类型定义。
//!
//! OTP 验证流程中的业务结果（验证码错误、过期、次数耗尽等）通过
//! [`OtpError`] 表示，它们是正常的返回值而不是异常；存储、随机数等
//! 基础设施层面的失败则由其余变体承载。

use std::fmt;
use std::time::Duration;

use crate::delivery::DeliveryMethod;

/// otpkit 库的统一结果类型
pub type Result<T> = std::result::Result<T, Error>;

/// otpkit 库的错误类型
#[derive(Debug)]
pub enum Error {
    /// OTP 业务结果（验证失败、发送失败等）
    Otp(OtpError),

    /// 输入验证错误
    Validation(ValidationError),

    /// 配置错误
    Config(ConfigError),

    /// 存储错误
    Storage(StorageError),

    /// 加密/随机数错误
    Crypto(CryptoError),

    /// 重发冷却中
    RateLimitExceeded {
        /// 重试等待时间
        retry_after: Duration,
    },

    /// 内部错误
    Internal(String),
}

impl Error {
    /// 创建一个内部错误
    pub fn internal(msg: impl Into<String>) -> Self {
        Error::Internal(msg.into())
    }

    /// 创建一个速率限制错误
    pub fn rate_limited(retry_after: Duration) -> Self {
        Error::RateLimitExceeded { retry_after }
    }

    /// 如果是 OTP 业务错误，返回其引用
    pub fn as_otp(&self) -> Option<&OtpError> {
        match self {
            Error::Otp(e) => Some(e),
            _ => None,
        }
    }

    /// 是否可以直接展示给终端用户
    ///
    /// 存储、加密、内部错误只应展示通用提示。
    pub fn is_user_facing(&self) -> bool {
        matches!(
            self,
            Error::Otp(_) | Error::Validation(_) | Error::RateLimitExceeded { .. }
        )
    }
}

/// OTP 业务错误
///
/// 每个变体的 `Display` 输出即为返回给调用方的提示消息。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OtpError {
    /// 该 (contact, method) 下没有记录
    NotFoundOrExpired,
    /// 尝试次数已耗尽，记录保留直到重新签发
    AttemptsExceeded,
    /// 验证时发现已过期，记录已被删除
    Expired,
    /// 验证码不匹配
    MismatchedCode {
        /// 剩余尝试次数
        remaining: u32,
    },
    /// 记录已验证过且策略拒绝重复验证
    AlreadyVerified,
    /// 投递失败，未创建记录
    DeliveryFailed {
        /// 投递渠道
        method: DeliveryMethod,
        /// 发送器报告的原因，只写入日志，不出现在提示消息中
        reason: String,
    },
}

/// 验证相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// 无效的邮箱格式
    InvalidEmail(String),
    /// 无效的手机号格式
    InvalidPhone(String),
    /// 未知的投递渠道
    InvalidMethod(String),
    /// 字段为空
    EmptyField(String),
}

/// 配置相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// 无效的配置值
    InvalidValue { key: String, message: String },
}

/// 存储相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    /// 锁被毒化（持锁线程 panic）
    LockPoisoned,
}

/// 加密相关错误
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CryptoError {
    /// 随机数生成失败
    RngFailed(String),
}

// ============================================================================
// Display 实现
// ============================================================================

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Otp(e) => write!(f, "OTP error: {}", e),
            Error::Validation(e) => write!(f, "Validation error: {}", e),
            Error::Config(e) => write!(f, "Config error: {}", e),
            Error::Storage(e) => write!(f, "Storage error: {}", e),
            Error::Crypto(e) => write!(f, "Crypto error: {}", e),
            Error::RateLimitExceeded { retry_after } => {
                write!(f, "Rate limit exceeded, retry after {:?}", retry_after)
            }
            Error::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl fmt::Display for OtpError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            OtpError::NotFoundOrExpired => write!(f, "OTP not found or expired"),
            OtpError::AttemptsExceeded => write!(f, "Maximum attempts exceeded"),
            OtpError::Expired => write!(f, "OTP expired"),
            OtpError::MismatchedCode { remaining } => {
                write!(f, "Invalid OTP. {} attempts remaining", remaining)
            }
            OtpError::AlreadyVerified => write!(f, "OTP already verified"),
            OtpError::DeliveryFailed { method, .. } => {
                write!(f, "Failed to send OTP via {}. Please try again.", method)
            }
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::InvalidEmail(email) => write!(f, "invalid email format: {}", email),
            ValidationError::InvalidPhone(phone) => {
                write!(f, "invalid phone number format: {}", phone)
            }
            ValidationError::InvalidMethod(method) => {
                write!(f, "unknown delivery method: {}", method)
            }
            ValidationError::EmptyField(field) => write!(f, "field '{}' cannot be empty", field),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::InvalidValue { key, message } => {
                write!(f, "invalid configuration value for '{}': {}", key, message)
            }
        }
    }
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StorageError::LockPoisoned => write!(f, "storage lock poisoned"),
        }
    }
}

impl fmt::Display for CryptoError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CryptoError::RngFailed(msg) => write!(f, "random number generation failed: {}", msg),
        }
    }
}

// ============================================================================
// std::error::Error 实现
// ============================================================================

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Otp(e) => Some(e),
            Error::Validation(e) => Some(e),
            Error::Config(e) => Some(e),
            Error::Storage(e) => Some(e),
            Error::Crypto(e) => Some(e),
            _ => None,
        }
    }
}

impl std::error::Error for OtpError {}
impl std::error::Error for ValidationError {}
impl std::error::Error for ConfigError {}
impl std::error::Error for StorageError {}
impl std::error::Error for CryptoError {}

// ============================================================================
// From 实现 - 方便错误转换
// ============================================================================

impl From<OtpError> for Error {
    fn from(err: OtpError) -> Self {
        Error::Otp(err)
    }
}

impl From<ValidationError> for Error {
    fn from(err: ValidationError) -> Self {
        Error::Validation(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<StorageError> for Error {
    fn from(err: StorageError) -> Self {
        Error::Storage(err)
    }
}

impl From<CryptoError> for Error {
    fn from(err: CryptoError) -> Self {
        Error::Crypto(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = Error::Otp(OtpError::Expired);
        assert_eq!(err.to_string(), "OTP error: OTP expired");
    }

    #[test]
    fn test_mismatched_code_message() {
        let err = OtpError::MismatchedCode { remaining: 2 };
        assert_eq!(err.to_string(), "Invalid OTP. 2 attempts remaining");
    }

    #[test]
    fn test_delivery_failed_message() {
        let err = OtpError::DeliveryFailed {
            method: DeliveryMethod::Sms,
            reason: "gateway timeout".to_string(),
        };
        assert_eq!(err.to_string(), "Failed to send OTP via sms. Please try again.");
    }

    #[test]
    fn test_error_from_otp() {
        let err: Error = OtpError::AttemptsExceeded.into();
        assert!(matches!(err, Error::Otp(OtpError::AttemptsExceeded)));
        assert_eq!(err.as_otp(), Some(&OtpError::AttemptsExceeded));
    }

    #[test]
    fn test_user_facing() {
        assert!(Error::Otp(OtpError::Expired).is_user_facing());
        assert!(Error::Validation(ValidationError::EmptyField("contact".into())).is_user_facing());
        assert!(!Error::Storage(StorageError::LockPoisoned).is_user_facing());
        assert!(!Error::internal("boom").is_user_facing());
    }

    #[test]
    fn test_validation_error_display() {
        let err = ValidationError::EmptyField("contact".to_string());
        assert_eq!(err.to_string(), "field 'contact' cannot be empty");
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::InvalidValue {
            key: "codeLength".to_string(),
            message: "must be between 4 and 10".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "invalid configuration value for 'codeLength': must be between 4 and 10"
        );
    }
}
