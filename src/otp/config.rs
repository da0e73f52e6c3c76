//! OTP 配置
//!
//! ## 构建器
//!
//! ```rust
//! use otpkit::otp::{OtpConfig, ReverifyPolicy};
//! use std::time::Duration;
//!
//! let config = OtpConfig::default()
//!     .with_code_length(6)                           // 6 位数字
//!     .with_expiry_window(Duration::from_secs(300))  // 5 分钟过期
//!     .with_max_attempts(3)                          // 最多尝试 3 次
//!     .with_reverify_policy(ReverifyPolicy::Allow);
//! ```
//!
//! ## 从 JSON 加载
//!
//! 键名沿用对外约定的 camelCase 名称，未给出的项使用默认值。
//!
//! ```rust
//! use otpkit::otp::{OtpConfig, OtpSettings};
//!
//! let settings = OtpSettings::from_json(r#"{ "maxAttempts": 5, "expiryWindowMs": 120000 }"#).unwrap();
//! let config = OtpConfig::try_from(settings).unwrap();
//! assert_eq!(config.max_attempts, 5);
//! assert_eq!(config.code_length, 6);
//! ```

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::{ConfigError, Error, Result};

/// 默认最大尝试次数
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// 默认有效期（毫秒）
pub const DEFAULT_EXPIRY_WINDOW_MS: u64 = 5 * 60 * 1000;

/// 默认验证码位数
pub const DEFAULT_CODE_LENGTH: usize = 6;

const CODE_LENGTH_RANGE: std::ops::RangeInclusive<usize> = 4..=10;

// ============================================================================
// 重复验证策略
// ============================================================================

/// 已验证记录再次收到验证请求时的处理方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReverifyPolicy {
    /// 照常处理：消耗一次尝试并重新比对
    #[default]
    Allow,
    /// 拒绝，返回 `AlreadyVerified`，不消耗尝试次数
    Reject,
    /// 验证成功后立即删除记录
    Consume,
}

// ============================================================================
// 配置
// ============================================================================

/// OTP 配置
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OtpConfig {
    /// 验证码长度（数字位数）
    pub code_length: usize,

    /// 有效期，`now - issued_at` 严格大于该值即视为过期
    pub expiry_window: Duration,

    /// 最大尝试次数（达到后锁定，直到重新签发）
    pub max_attempts: u32,

    /// 同一 (contact, method) 两次签发之间的最小间隔
    pub resend_cooldown: Option<Duration>,

    /// 重复验证策略
    pub reverify_policy: ReverifyPolicy,
}

impl Default for OtpConfig {
    fn default() -> Self {
        Self {
            code_length: DEFAULT_CODE_LENGTH,
            expiry_window: Duration::from_millis(DEFAULT_EXPIRY_WINDOW_MS),
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            resend_cooldown: None,
            reverify_policy: ReverifyPolicy::Allow,
        }
    }
}

impl OtpConfig {
    /// 创建新配置
    pub fn new() -> Self {
        Self::default()
    }

    /// 设置验证码长度
    pub fn with_code_length(mut self, length: usize) -> Self {
        assert!(
            CODE_LENGTH_RANGE.contains(&length),
            "code length must be between 4 and 10"
        );
        self.code_length = length;
        self
    }

    /// 设置有效期
    pub fn with_expiry_window(mut self, window: Duration) -> Self {
        self.expiry_window = window;
        self
    }

    /// 设置最大尝试次数
    pub fn with_max_attempts(mut self, max: u32) -> Self {
        self.max_attempts = max;
        self
    }

    /// 设置重发冷却时间
    pub fn with_resend_cooldown(mut self, cooldown: Option<Duration>) -> Self {
        self.resend_cooldown = cooldown;
        self
    }

    /// 设置重复验证策略
    pub fn with_reverify_policy(mut self, policy: ReverifyPolicy) -> Self {
        self.reverify_policy = policy;
        self
    }

    /// 高安全性配置
    ///
    /// - 8 位验证码
    /// - 3 分钟过期
    /// - 最多 3 次尝试
    /// - 1 分钟重发间隔
    /// - 验证成功即失效
    pub fn high_security() -> Self {
        Self {
            code_length: 8,
            expiry_window: Duration::from_secs(3 * 60),
            max_attempts: 3,
            resend_cooldown: Some(Duration::from_secs(60)),
            reverify_policy: ReverifyPolicy::Consume,
        }
    }

    /// 宽松配置（适用于开发/测试）
    ///
    /// - 4 位验证码
    /// - 30 分钟过期
    /// - 10 次尝试
    pub fn relaxed() -> Self {
        Self {
            code_length: 4,
            expiry_window: Duration::from_secs(30 * 60),
            max_attempts: 10,
            resend_cooldown: None,
            reverify_policy: ReverifyPolicy::Allow,
        }
    }

    /// 校验配置是否可用
    pub fn validate(&self) -> Result<()> {
        if !CODE_LENGTH_RANGE.contains(&self.code_length) {
            return Err(invalid("codeLength", "must be between 4 and 10"));
        }
        if self.max_attempts == 0 {
            return Err(invalid("maxAttempts", "must be at least 1"));
        }
        if self.expiry_window.is_zero() {
            return Err(invalid("expiryWindowMs", "must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(key: &str, message: &str) -> Error {
    Error::Config(ConfigError::InvalidValue {
        key: key.to_string(),
        message: message.to_string(),
    })
}

// ============================================================================
// 外部配置格式
// ============================================================================

/// 可序列化的配置项
///
/// 所有字段可选，缺省时取 [`OtpConfig::default`] 中的值。
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct OtpSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_attempts: Option<u32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_window_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code_length: Option<usize>,

    /// 0 表示关闭冷却
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resend_cooldown_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reverify_policy: Option<ReverifyPolicy>,
}

impl OtpSettings {
    /// 解析 JSON 配置
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| {
            Error::Config(ConfigError::InvalidValue {
                key: "<root>".to_string(),
                message: e.to_string(),
            })
        })
    }
}

impl TryFrom<OtpSettings> for OtpConfig {
    type Error = Error;

    fn try_from(settings: OtpSettings) -> Result<Self> {
        let defaults = OtpConfig::default();
        let config = OtpConfig {
            code_length: settings.code_length.unwrap_or(defaults.code_length),
            expiry_window: settings
                .expiry_window_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.expiry_window),
            max_attempts: settings.max_attempts.unwrap_or(defaults.max_attempts),
            resend_cooldown: match settings.resend_cooldown_ms {
                Some(0) | None => None,
                Some(ms) => Some(Duration::from_millis(ms)),
            },
            reverify_policy: settings.reverify_policy.unwrap_or_default(),
        };
        config.validate()?;
        Ok(config)
    }
}

impl From<&OtpConfig> for OtpSettings {
    fn from(config: &OtpConfig) -> Self {
        Self {
            max_attempts: Some(config.max_attempts),
            expiry_window_ms: Some(config.expiry_window.as_millis() as u64),
            code_length: Some(config.code_length),
            resend_cooldown_ms: config.resend_cooldown.map(|d| d.as_millis() as u64),
            reverify_policy: Some(config.reverify_policy),
        }
    }
}
