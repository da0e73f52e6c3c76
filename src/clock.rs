//! 时钟抽象
//!
//! 过期判断依赖当前时间，抽象成 trait 便于在测试中精确控制时间。

use chrono::{DateTime, Duration, Utc};
use std::sync::{Arc, RwLock};

/// 时间来源
pub trait Clock: Send + Sync {
    /// 返回当前时间
    fn now(&self) -> DateTime<Utc>;
}

/// 系统时钟
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// 手动推进的时钟
///
/// 克隆出的实例共享同一个时间点，适合把一份交给 `OtpService`、
/// 另一份留在测试中推进。
///
/// ```rust
/// use otpkit::clock::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::at_epoch();
/// let start = clock.now();
/// clock.advance(Duration::from_millis(1500));
/// assert_eq!((clock.now() - start).num_milliseconds(), 1500);
/// ```
#[derive(Debug, Clone)]
pub struct ManualClock {
    now: Arc<RwLock<DateTime<Utc>>>,
}

impl ManualClock {
    /// 从指定时间开始
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: Arc::new(RwLock::new(start)),
        }
    }

    /// 从 Unix 纪元开始，便于用毫秒偏移描述测试场景
    pub fn at_epoch() -> Self {
        Self::new(DateTime::<Utc>::UNIX_EPOCH)
    }

    /// 向前推进
    ///
    /// 超出 `chrono` 可表示范围时停在 [`DateTime::<Utc>::MAX_UTC`]。
    pub fn advance(&self, by: std::time::Duration) {
        let mut now = self.now.write().unwrap_or_else(|e| e.into_inner());
        let next = Duration::from_std(by)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        *now = next;
    }

    /// 直接设置当前时间
    pub fn set(&self, to: DateTime<Utc>) {
        *self.now.write().unwrap_or_else(|e| e.into_inner()) = to;
    }
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read().unwrap_or_else(|e| e.into_inner())
    }
}
