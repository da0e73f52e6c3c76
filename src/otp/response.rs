//! 面向表单层的统一响应
//!
//! 表单层只需要 `{ success, message }`。业务错误和输入错误原样展示其消息；
//! 存储、随机数等内部错误只展示通用的重试提示，细节写入日志。

use serde::{Deserialize, Serialize};

use super::service::{IssuedOtp, Verification, ceil_secs};
use crate::error::{Error, Result};

/// 内部错误时展示给用户的消息
pub const GENERIC_FAILURE_MESSAGE: &str = "Something went wrong. Please try again.";

/// 签发/验证的响应
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpResponse {
    pub success: bool,
    pub message: String,
}

impl OtpResponse {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }

    /// 把错误映射为失败响应
    ///
    /// 非 [`Error::is_user_facing`] 的错误只返回通用提示，细节写入日志。
    pub fn from_error(err: &Error) -> Self {
        if !err.is_user_facing() {
            tracing::error!(error = %err, "unexpected OTP failure");
            return Self::failure(GENERIC_FAILURE_MESSAGE);
        }

        let message = match err {
            Error::Otp(e) => e.to_string(),
            Error::Validation(e) => e.to_string(),
            Error::RateLimitExceeded { retry_after } => {
                format!(
                    "Please wait {} seconds before requesting a new code",
                    ceil_secs(*retry_after)
                )
            }
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        };
        Self::failure(message)
    }
}

impl From<Result<IssuedOtp>> for OtpResponse {
    fn from(result: Result<IssuedOtp>) -> Self {
        match result {
            Ok(issued) => Self::ok(issued.message()),
            Err(e) => Self::from_error(&e),
        }
    }
}

impl From<Result<Verification>> for OtpResponse {
    fn from(result: Result<Verification>) -> Self {
        match result {
            Ok(verification) => Self::ok(verification.message()),
            Err(e) => Self::from_error(&e),
        }
    }
}
