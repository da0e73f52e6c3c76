//! OTP 记录与存储
//!
//! 每个 `(contact, method)` 至多对应一条 [`OtpRecord`]。存储只负责
//! 原子地读写单条记录；验证流程的先后判断由 `OtpService` 在持有该键的
//! 锁时完成。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::Duration;

use crate::delivery::DeliveryMethod;
use crate::error::{Result, StorageError};

// ============================================================================
// 数据结构
// ============================================================================

/// OTP 存储键
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct OtpKey {
    /// 联系方式（邮箱或手机号）
    pub contact: String,
    /// 投递渠道
    pub method: DeliveryMethod,
}

impl OtpKey {
    pub fn new(contact: impl Into<String>, method: DeliveryMethod) -> Self {
        Self {
            contact: contact.into(),
            method,
        }
    }
}

impl fmt::Display for OtpKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{}", self.contact, self.method)
    }
}

/// 存储的 OTP 记录
#[derive(Clone, PartialEq, Eq)]
pub struct OtpRecord {
    /// 验证码
    pub code: String,

    /// 签发时间
    pub issued_at: DateTime<Utc>,

    /// 是否已通过验证；只会由 false 变为 true
    pub verified: bool,

    /// 已消耗的尝试次数
    pub attempt_count: u32,
}

impl OtpRecord {
    /// 新签发的记录
    pub fn new(code: impl Into<String>, issued_at: DateTime<Utc>) -> Self {
        Self {
            code: code.into(),
            issued_at,
            verified: false,
            attempt_count: 0,
        }
    }

    /// 检查在 `now` 时刻是否已过期
    ///
    /// 只有 `now - issued_at` 严格大于 `window` 才算过期；时钟回拨时不算过期。
    pub fn is_expired(&self, now: DateTime<Utc>, window: Duration) -> bool {
        match (now - self.issued_at).to_std() {
            Ok(elapsed) => elapsed > window,
            Err(_) => false,
        }
    }

    /// 过期时间
    pub fn expires_at(&self, window: Duration) -> DateTime<Utc> {
        chrono::Duration::from_std(window)
            .ok()
            .and_then(|w| self.issued_at.checked_add_signed(w))
            .unwrap_or(DateTime::<Utc>::MAX_UTC)
    }

    /// 是否已达到尝试上限
    pub fn is_locked(&self, max_attempts: u32) -> bool {
        self.attempt_count >= max_attempts
    }

    /// 剩余尝试次数
    pub fn attempts_remaining(&self, max_attempts: u32) -> u32 {
        max_attempts.saturating_sub(self.attempt_count)
    }
}

// 验证码不进入 Debug 输出
impl fmt::Debug for OtpRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OtpRecord")
            .field("code", &"<redacted>")
            .field("issued_at", &self.issued_at)
            .field("verified", &self.verified)
            .field("attempt_count", &self.attempt_count)
            .finish()
    }
}

// ============================================================================
// 存储接口
// ============================================================================

/// OTP 存储接口
///
/// 实现此 trait 以提供自定义的存储后端。每个方法对单条记录必须是原子的。
pub trait OtpStore: Send + Sync {
    /// 写入记录，覆盖同键的旧记录
    fn put(&self, key: &OtpKey, record: OtpRecord) -> Result<()>;

    /// 读取记录
    fn get(&self, key: &OtpKey) -> Result<Option<OtpRecord>>;

    /// 尝试次数加一，返回新的次数；记录不存在时返回 `None`
    fn record_attempt(&self, key: &OtpKey) -> Result<Option<u32>>;

    /// 标记为已验证
    fn mark_verified(&self, key: &OtpKey) -> Result<()>;

    /// 删除记录，返回是否存在过
    fn delete(&self, key: &OtpKey) -> Result<bool>;

    /// 删除在 `now` 时刻已过期的记录，返回删除数量
    fn cleanup_expired(&self, now: DateTime<Utc>, window: Duration) -> Result<usize>;
}

// ============================================================================
// 内存存储实现
// ============================================================================

/// 内存存储实现
///
/// 进程退出后记录全部丢失。克隆出的实例共享同一份数据。
#[derive(Debug, Clone, Default)]
pub struct InMemoryOtpStore {
    records: Arc<RwLock<HashMap<OtpKey, OtpRecord>>>,
}

impl InMemoryOtpStore {
    /// 创建新的内存存储
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取当前存储的记录数量
    pub fn len(&self) -> usize {
        self.read().map(|records| records.len()).unwrap_or(0)
    }

    /// 检查存储是否为空
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<OtpKey, OtpRecord>>> {
        self.records
            .read()
            .map_err(|_| StorageError::LockPoisoned.into())
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<OtpKey, OtpRecord>>> {
        self.records
            .write()
            .map_err(|_| StorageError::LockPoisoned.into())
    }
}

impl OtpStore for InMemoryOtpStore {
    fn put(&self, key: &OtpKey, record: OtpRecord) -> Result<()> {
        self.write()?.insert(key.clone(), record);
        Ok(())
    }

    fn get(&self, key: &OtpKey) -> Result<Option<OtpRecord>> {
        Ok(self.read()?.get(key).cloned())
    }

    fn record_attempt(&self, key: &OtpKey) -> Result<Option<u32>> {
        let mut records = self.write()?;
        Ok(records.get_mut(key).map(|record| {
            record.attempt_count = record.attempt_count.saturating_add(1);
            record.attempt_count
        }))
    }

    fn mark_verified(&self, key: &OtpKey) -> Result<()> {
        if let Some(record) = self.write()?.get_mut(key) {
            record.verified = true;
        }
        Ok(())
    }

    fn delete(&self, key: &OtpKey) -> Result<bool> {
        Ok(self.write()?.remove(key).is_some())
    }

    fn cleanup_expired(&self, now: DateTime<Utc>, window: Duration) -> Result<usize> {
        let mut records = self.write()?;
        let before = records.len();
        records.retain(|_, record| !record.is_expired(now, window));
        Ok(before - records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration as ChronoDuration;

    fn epoch() -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH
    }

    fn key(contact: &str) -> OtpKey {
        OtpKey::new(contact, DeliveryMethod::Email)
    }

    #[test]
    fn test_record_expiry_is_strict() {
        let record = OtpRecord::new("123456", epoch());
        let window = Duration::from_millis(300_000);

        assert!(!record.is_expired(epoch() + ChronoDuration::milliseconds(300_000), window));
        assert!(record.is_expired(epoch() + ChronoDuration::milliseconds(300_001), window));
    }

    #[test]
    fn test_record_not_expired_when_clock_goes_back() {
        let record = OtpRecord::new("123456", epoch() + ChronoDuration::hours(1));
        assert!(!record.is_expired(epoch(), Duration::from_secs(1)));
    }

    #[test]
    fn test_record_expires_at() {
        let record = OtpRecord::new("123456", epoch());
        assert_eq!(
            record.expires_at(Duration::from_secs(300)),
            epoch() + ChronoDuration::seconds(300)
        );
    }

    #[test]
    fn test_record_attempts() {
        let mut record = OtpRecord::new("123456", epoch());
        assert_eq!(record.attempts_remaining(3), 3);
        assert!(!record.is_locked(3));

        record.attempt_count = 3;
        assert_eq!(record.attempts_remaining(3), 0);
        assert!(record.is_locked(3));
    }

    #[test]
    fn test_record_debug_redacts_code() {
        let record = OtpRecord::new("987654", epoch());
        let debug = format!("{:?}", record);
        assert!(!debug.contains("987654"));
        assert!(debug.contains("<redacted>"));
    }

    #[test]
    fn test_key_display() {
        assert_eq!(key("user@example.com").to_string(), "user@example.com-email");
    }

    #[test]
    fn test_put_overwrites() {
        let store = InMemoryOtpStore::new();
        let k = key("user@example.com");

        store.put(&k, OtpRecord::new("111111", epoch())).unwrap();
        store.record_attempt(&k).unwrap();
        store.put(&k, OtpRecord::new("222222", epoch())).unwrap();

        let record = store.get(&k).unwrap().unwrap();
        assert_eq!(record.code, "222222");
        assert_eq!(record.attempt_count, 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_record_attempt() {
        let store = InMemoryOtpStore::new();
        let k = key("user@example.com");

        assert_eq!(store.record_attempt(&k).unwrap(), None);

        store.put(&k, OtpRecord::new("111111", epoch())).unwrap();
        assert_eq!(store.record_attempt(&k).unwrap(), Some(1));
        assert_eq!(store.record_attempt(&k).unwrap(), Some(2));
    }

    #[test]
    fn test_mark_verified_and_delete() {
        let store = InMemoryOtpStore::new();
        let k = key("user@example.com");
        store.put(&k, OtpRecord::new("111111", epoch())).unwrap();

        store.mark_verified(&k).unwrap();
        assert!(store.get(&k).unwrap().unwrap().verified);

        assert!(store.delete(&k).unwrap());
        assert!(!store.delete(&k).unwrap());
        assert!(store.is_empty());
    }

    #[test]
    fn test_methods_are_independent() {
        let store = InMemoryOtpStore::new();
        let email = OtpKey::new("alice", DeliveryMethod::Email);
        let sms = OtpKey::new("alice", DeliveryMethod::Sms);

        store.put(&email, OtpRecord::new("111111", epoch())).unwrap();
        assert!(store.get(&sms).unwrap().is_none());
    }

    #[test]
    fn test_cleanup_expired() {
        let store = InMemoryOtpStore::new();
        store
            .put(&key("old@example.com"), OtpRecord::new("111111", epoch()))
            .unwrap();
        store
            .put(
                &key("new@example.com"),
                OtpRecord::new("222222", epoch() + ChronoDuration::minutes(4)),
            )
            .unwrap();

        let now = epoch() + ChronoDuration::minutes(6);
        let removed = store.cleanup_expired(now, Duration::from_secs(300)).unwrap();
        assert_eq!(removed, 1);
        assert!(store.get(&key("new@example.com")).unwrap().is_some());
    }

    #[test]
    fn test_clone_shares_records() {
        let store = InMemoryOtpStore::new();
        let other = store.clone();
        store
            .put(&key("user@example.com"), OtpRecord::new("111111", epoch()))
            .unwrap();
        assert_eq!(other.len(), 1);
    }
}
