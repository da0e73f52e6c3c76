//! OTP 签发与验证服务

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use super::config::{OtpConfig, ReverifyPolicy};
use super::generator::{CodeGenerator, RandomCodeGenerator};
use super::store::{InMemoryOtpStore, OtpKey, OtpRecord, OtpStore};
use crate::audit::{AuditLogger, NoOpAuditLogger, SecurityEvent};
use crate::clock::{Clock, SystemClock};
use crate::contact::mask_contact;
use crate::delivery::{DeliveryMethod, DeliverySender, SimulatedSender};
use crate::error::{Error, OtpError, Result, StorageError, ValidationError};
use crate::random::constant_time_compare_str;

// ============================================================================
// 返回数据
// ============================================================================

/// 签发成功后的回执
///
/// 不包含验证码本身；验证码只交给 [`DeliverySender`]。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedOtp {
    pub contact: String,
    pub method: DeliveryMethod,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    /// 验证码位数，供表单层渲染输入框
    pub code_length: usize,
}

impl IssuedOtp {
    /// 面向用户的提示消息
    pub fn message(&self) -> String {
        format!("OTP sent successfully via {}", self.method)
    }
}

/// 验证成功的结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verification {
    pub contact: String,
    pub method: DeliveryMethod,
    pub verified_at: DateTime<Utc>,
    /// 包含本次在内已消耗的尝试次数
    pub attempts_used: u32,
}

impl Verification {
    pub fn message(&self) -> &'static str {
        "OTP verified successfully"
    }
}

/// 记录当前所处的状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OtpState {
    /// 可以继续验证
    Active,
    /// 已验证通过
    Verified,
    /// 尝试次数耗尽
    Locked,
    /// 已过期，下一次验证时会被删除
    Expired,
}

/// 记录的只读视图，不含验证码
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OtpStatus {
    pub state: OtpState,
    pub attempts_used: u32,
    pub attempts_remaining: u32,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

// ============================================================================
// 按键加锁
// ============================================================================

/// 每个 (contact, method) 一把异步锁
///
/// 签发在等待投递期间持有锁，因此同一键上的验证要么看到旧记录，要么看到
/// 完整写入的新记录。不同键互不影响。最后一个持有者释放时条目随之移除，
/// 表中只保留正在使用的键。
#[derive(Debug, Default)]
struct KeyLocks {
    locks: Mutex<HashMap<OtpKey, Arc<AsyncMutex<()>>>>,
}

impl KeyLocks {
    async fn acquire(&self, key: &OtpKey) -> Result<KeyGuard<'_>> {
        let lock = {
            let mut locks = self.locks.lock().map_err(|_| StorageError::LockPoisoned)?;
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        let guard = lock.lock_owned().await;
        Ok(KeyGuard {
            locks: self,
            key: key.clone(),
            guard: Some(guard),
        })
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or(0)
    }
}

/// 持有中的键锁，释放时清理无人等待的条目
struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: OtpKey,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // 在表锁内释放，其他任务无法在检查引用计数之后再取走这把锁
        let Ok(mut locks) = self.locks.locks.lock() else {
            return;
        };
        drop(self.guard.take());
        if locks
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            locks.remove(&self.key);
        }
    }
}

// ============================================================================
// OTP 服务
// ============================================================================

/// OTP 服务
///
/// 持有全部 OTP 记录以及时钟、发送器、生成器等协作者。没有全局单例，
/// 由应用显式构造并传递。
///
/// ## 示例
///
/// ```rust
/// # tokio::runtime::Runtime::new().unwrap().block_on(async {
/// use otpkit::{DeliveryMethod, OtpService};
/// use otpkit::otp::FixedCodeGenerator;
///
/// let service = OtpService::builder()
///     .generator(FixedCodeGenerator::new("123456"))
///     .build()
///     .unwrap();
///
/// service.issue("user@example.com", DeliveryMethod::Email).await.unwrap();
///
/// let err = service
///     .verify("user@example.com", DeliveryMethod::Email, "000000")
///     .await
///     .unwrap_err();
/// assert_eq!(err.as_otp().unwrap().to_string(), "Invalid OTP. 2 attempts remaining");
///
/// assert!(service
///     .verify("user@example.com", DeliveryMethod::Email, "123456")
///     .await
///     .is_ok());
/// # });
/// ```
pub struct OtpService<S: OtpStore = InMemoryOtpStore> {
    store: S,
    config: OtpConfig,
    clock: Arc<dyn Clock>,
    sender: Arc<dyn DeliverySender>,
    generator: Arc<dyn CodeGenerator>,
    audit: Arc<dyn AuditLogger>,
    locks: KeyLocks,
}

impl OtpService<InMemoryOtpStore> {
    /// 使用内存存储和默认协作者创建服务
    pub fn new(config: OtpConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// 构建器
    pub fn builder() -> OtpServiceBuilder<InMemoryOtpStore> {
        OtpServiceBuilder::new()
    }
}

impl<S: OtpStore> OtpService<S> {
    /// 签发 OTP
    ///
    /// 生成验证码并等待发送器投递，投递成功后写入新记录（覆盖同键旧记录，
    /// 尝试次数清零、验证状态重置）。
    ///
    /// # Errors
    ///
    /// - `contact` 为空
    /// - 开启重发冷却且距上次签发不足冷却时间
    /// - 发送器报告失败（[`OtpError::DeliveryFailed`]），此时不创建也不修改记录
    pub async fn issue(&self, contact: &str, method: DeliveryMethod) -> Result<IssuedOtp> {
        if contact.trim().is_empty() {
            return Err(ValidationError::EmptyField("contact".to_string()).into());
        }
        let key = OtpKey::new(contact, method);
        let masked = mask_contact(contact, method);

        let _guard = self.locks.acquire(&key).await?;

        if let Some(retry_after) = self.cooldown_remaining(&key)? {
            tracing::debug!(contact = %masked, %method, ?retry_after, "OTP resend rejected by cooldown");
            return Err(Error::rate_limited(retry_after));
        }

        let code = self.generator.generate(self.config.code_length)?;
        tracing::trace!(contact = %masked, %method, %code, "generated OTP");

        if let Err(e) = self.sender.send(contact, method, &code).await {
            tracing::warn!(contact = %masked, %method, error = %e, "OTP delivery failed");
            self.record(SecurityEvent::otp_delivery_failed(contact, method, e.to_string()));
            return Err(OtpError::DeliveryFailed {
                method,
                reason: e.to_string(),
            }
            .into());
        }

        let issued_at = self.clock.now();
        let record = OtpRecord::new(code, issued_at);
        let expires_at = record.expires_at(self.config.expiry_window);
        self.store.put(&key, record)?;

        tracing::info!(contact = %masked, %method, %expires_at, "OTP issued");
        self.record(SecurityEvent::otp_sent(contact, method));

        Ok(IssuedOtp {
            contact: key.contact,
            method,
            issued_at,
            expires_at,
            code_length: self.config.code_length,
        })
    }

    /// 验证 OTP
    ///
    /// 按顺序判断，命中即返回：
    ///
    /// 1. 没有记录 → [`OtpError::NotFoundOrExpired`]
    /// 2. 尝试次数已达上限 → [`OtpError::AttemptsExceeded`]，不再计数
    /// 3. 已过期 → 删除记录，[`OtpError::Expired`]
    /// 4. 已验证且策略为 `Reject` → [`OtpError::AlreadyVerified`]
    /// 5. 尝试次数加一（无论是否匹配）
    /// 6. 匹配 → 标记已验证（`Consume` 策略下删除记录）
    /// 7. 不匹配 → [`OtpError::MismatchedCode`]，携带剩余次数
    ///
    /// `input` 可以是任意字符串，格式不对只会导致不匹配。比较为常量时间。
    pub async fn verify(
        &self,
        contact: &str,
        method: DeliveryMethod,
        input: &str,
    ) -> Result<Verification> {
        let key = OtpKey::new(contact, method);
        let masked = mask_contact(contact, method);
        let max_attempts = self.config.max_attempts;

        let _guard = self.locks.acquire(&key).await?;

        let Some(record) = self.store.get(&key)? else {
            tracing::debug!(contact = %masked, %method, "no OTP on record");
            return Err(self.reject(&key, OtpError::NotFoundOrExpired));
        };

        if record.is_locked(max_attempts) {
            tracing::debug!(contact = %masked, %method, "OTP is locked");
            return Err(self.reject(&key, OtpError::AttemptsExceeded));
        }

        let now = self.clock.now();
        if record.is_expired(now, self.config.expiry_window) {
            self.store.delete(&key)?;
            tracing::warn!(contact = %masked, %method, issued_at = %record.issued_at, "OTP expired");
            self.record(SecurityEvent::otp_expired(contact, method));
            return Err(OtpError::Expired.into());
        }

        if record.verified && self.config.reverify_policy == ReverifyPolicy::Reject {
            return Err(self.reject(&key, OtpError::AlreadyVerified));
        }

        let attempts = self
            .store
            .record_attempt(&key)?
            .ok_or_else(|| Error::internal(format!("OTP record for {} vanished", masked)))?;

        if !constant_time_compare_str(input, &record.code) {
            let remaining = max_attempts.saturating_sub(attempts);
            tracing::debug!(contact = %masked, %method, remaining, "OTP mismatch");
            if remaining == 0 {
                tracing::warn!(contact = %masked, %method, attempts, "OTP locked");
                self.record(SecurityEvent::otp_locked(contact, method, attempts));
            }
            return Err(self.reject(&key, OtpError::MismatchedCode { remaining }));
        }

        match self.config.reverify_policy {
            ReverifyPolicy::Consume => {
                self.store.delete(&key)?;
            }
            ReverifyPolicy::Allow | ReverifyPolicy::Reject => self.store.mark_verified(&key)?,
        }

        tracing::info!(contact = %masked, %method, attempts, "OTP verified");
        self.record(SecurityEvent::otp_verified(contact, method));

        Ok(Verification {
            contact: key.contact,
            method,
            verified_at: now,
            attempts_used: attempts,
        })
    }

    /// 撤销 OTP，返回是否存在记录
    pub async fn revoke(&self, contact: &str, method: DeliveryMethod) -> Result<bool> {
        let key = OtpKey::new(contact, method);
        let _guard = self.locks.acquire(&key).await?;

        let existed = self.store.delete(&key)?;
        if existed {
            self.record(SecurityEvent::otp_revoked(contact, method));
        }
        Ok(existed)
    }

    /// 清理已过期的记录
    ///
    /// 过期判断在验证时惰性完成，这里只是回收内存，由调用方决定何时执行。
    pub fn cleanup_expired(&self) -> Result<usize> {
        let removed = self
            .store
            .cleanup_expired(self.clock.now(), self.config.expiry_window)?;
        tracing::debug!(removed, "OTP cleanup finished");
        Ok(removed)
    }

    /// 查看记录状态，不修改任何数据
    pub fn status(&self, contact: &str, method: DeliveryMethod) -> Result<Option<OtpStatus>> {
        let key = OtpKey::new(contact, method);
        let Some(record) = self.store.get(&key)? else {
            return Ok(None);
        };

        let max_attempts = self.config.max_attempts;
        let window = self.config.expiry_window;
        let state = if record.is_locked(max_attempts) {
            OtpState::Locked
        } else if record.is_expired(self.clock.now(), window) {
            OtpState::Expired
        } else if record.verified {
            OtpState::Verified
        } else {
            OtpState::Active
        };

        Ok(Some(OtpStatus {
            state,
            attempts_used: record.attempt_count,
            attempts_remaining: record.attempts_remaining(max_attempts),
            issued_at: record.issued_at,
            expires_at: record.expires_at(window),
        }))
    }

    /// 检查是否可以签发新的 OTP（重发冷却）
    pub fn can_issue(&self, contact: &str, method: DeliveryMethod) -> Result<bool> {
        Ok(self
            .cooldown_remaining(&OtpKey::new(contact, method))?
            .is_none())
    }

    /// 距离可以重新签发的剩余秒数（向上取整）
    pub fn seconds_until_can_issue(&self, contact: &str, method: DeliveryMethod) -> Result<u64> {
        let remaining = self.cooldown_remaining(&OtpKey::new(contact, method))?;
        Ok(remaining.map(ceil_secs).unwrap_or(0))
    }

    /// 获取配置
    pub fn config(&self) -> &OtpConfig {
        &self.config
    }

    /// 获取存储
    pub fn store(&self) -> &S {
        &self.store
    }

    fn cooldown_remaining(&self, key: &OtpKey) -> Result<Option<Duration>> {
        let Some(cooldown) = self.config.resend_cooldown else {
            return Ok(None);
        };
        let Some(record) = self.store.get(key)? else {
            return Ok(None);
        };

        let elapsed = (self.clock.now() - record.issued_at)
            .to_std()
            .unwrap_or(Duration::ZERO);
        Ok(cooldown.checked_sub(elapsed).filter(|d| !d.is_zero()))
    }

    /// 以服务时钟的时间写入审计事件
    fn record(&self, event: SecurityEvent) {
        self.audit.log(event.with_timestamp(self.clock.now()));
    }

    fn reject(&self, key: &OtpKey, err: OtpError) -> Error {
        self.record(SecurityEvent::otp_failed(
            key.contact.as_str(),
            key.method,
            err.to_string(),
        ));
        err.into()
    }
}

pub(crate) fn ceil_secs(d: Duration) -> u64 {
    d.as_secs() + u64::from(d.subsec_nanos() > 0)
}

// ============================================================================
// 构建器
// ============================================================================

/// [`OtpService`] 构建器
///
/// 未指定的协作者使用默认实现：系统时钟、模拟发送器、随机验证码、
/// 不记录审计日志。
pub struct OtpServiceBuilder<S: OtpStore = InMemoryOtpStore> {
    store: S,
    config: OtpConfig,
    clock: Arc<dyn Clock>,
    sender: Arc<dyn DeliverySender>,
    generator: Arc<dyn CodeGenerator>,
    audit: Arc<dyn AuditLogger>,
}

impl OtpServiceBuilder<InMemoryOtpStore> {
    pub fn new() -> Self {
        Self {
            store: InMemoryOtpStore::new(),
            config: OtpConfig::default(),
            clock: Arc::new(SystemClock),
            sender: Arc::new(SimulatedSender::new()),
            generator: Arc::new(RandomCodeGenerator),
            audit: Arc::new(NoOpAuditLogger),
        }
    }
}

impl Default for OtpServiceBuilder<InMemoryOtpStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: OtpStore> OtpServiceBuilder<S> {
    /// 替换存储后端
    pub fn store<T: OtpStore>(self, store: T) -> OtpServiceBuilder<T> {
        OtpServiceBuilder {
            store,
            config: self.config,
            clock: self.clock,
            sender: self.sender,
            generator: self.generator,
            audit: self.audit,
        }
    }

    pub fn config(mut self, config: OtpConfig) -> Self {
        self.config = config;
        self
    }

    pub fn clock(mut self, clock: impl Clock + 'static) -> Self {
        self.clock = Arc::new(clock);
        self
    }

    pub fn sender(mut self, sender: impl DeliverySender + 'static) -> Self {
        self.sender = Arc::new(sender);
        self
    }

    pub fn generator(mut self, generator: impl CodeGenerator + 'static) -> Self {
        self.generator = Arc::new(generator);
        self
    }

    pub fn audit_logger(mut self, audit: impl AuditLogger + 'static) -> Self {
        self.audit = Arc::new(audit);
        self
    }

    /// 校验配置并构建服务
    pub fn build(self) -> Result<OtpService<S>> {
        self.config.validate()?;
        Ok(OtpService {
            store: self.store,
            config: self.config,
            clock: self.clock,
            sender: self.sender,
            generator: self.generator,
            audit: self.audit,
            locks: KeyLocks::default(),
        })
    }
}
