//! 审计日志模块
//!
//! 记录 OTP 生命周期中的安全事件，包括：
//!
//! - **安全事件**: 签发、验证成功/失败、过期、锁定、投递失败、撤销
//! - **审计日志 Trait**: 定义日志记录接口，`OtpService` 通过它上报事件
//! - **内存实现**: 用于测试和开发的简单实现
//!
//! ## 使用示例
//!
//! ```rust
//! use otpkit::audit::{AuditLogger, EventSeverity, InMemoryAuditLogger, SecurityEvent};
//! use otpkit::DeliveryMethod;
//!
//! let logger = InMemoryAuditLogger::new();
//!
//! logger.log(SecurityEvent::otp_sent("user@example.com", DeliveryMethod::Email));
//! logger.log(SecurityEvent::otp_failed(
//!     "user@example.com",
//!     DeliveryMethod::Email,
//!     "Invalid OTP. 2 attempts remaining",
//! ));
//!
//! assert_eq!(logger.event_count(), 2);
//! assert_eq!(logger.get_events_by_severity(EventSeverity::Warning).len(), 1);
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use crate::delivery::DeliveryMethod;

/// 事件严重程度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum EventSeverity {
    /// 调试信息
    Debug,
    /// 一般信息
    #[default]
    Info,
    /// 警告
    Warning,
    /// 错误
    Error,
    /// 严重/危险
    Critical,
}

impl std::fmt::Display for EventSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventSeverity::Debug => write!(f, "DEBUG"),
            EventSeverity::Info => write!(f, "INFO"),
            EventSeverity::Warning => write!(f, "WARNING"),
            EventSeverity::Error => write!(f, "ERROR"),
            EventSeverity::Critical => write!(f, "CRITICAL"),
        }
    }
}

/// 安全事件类型
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EventType {
    /// OTP 已发送
    OtpSent,
    /// OTP 验证成功
    OtpVerified,
    /// OTP 验证失败
    OtpFailed,
    /// OTP 过期
    OtpExpired,
    /// 尝试次数耗尽
    OtpLocked,
    /// OTP 投递失败
    OtpDeliveryFailed,
    /// OTP 被撤销
    OtpRevoked,
    /// 自定义事件
    Custom(String),
}

impl std::fmt::Display for EventType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            EventType::OtpSent => write!(f, "otp_sent"),
            EventType::OtpVerified => write!(f, "otp_verified"),
            EventType::OtpFailed => write!(f, "otp_failed"),
            EventType::OtpExpired => write!(f, "otp_expired"),
            EventType::OtpLocked => write!(f, "otp_locked"),
            EventType::OtpDeliveryFailed => write!(f, "otp_delivery_failed"),
            EventType::OtpRevoked => write!(f, "otp_revoked"),
            EventType::Custom(name) => write!(f, "custom:{}", name),
        }
    }
}

/// 安全事件
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityEvent {
    /// 事件 ID
    pub id: String,
    /// 事件类型
    pub event_type: EventType,
    /// 严重程度
    pub severity: EventSeverity,
    /// 联系方式（如果适用）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    /// 投递渠道（如果适用）
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<DeliveryMethod>,
    /// 事件消息/描述
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    /// 额外详情
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub details: HashMap<String, String>,
    /// 事件时间
    pub timestamp: DateTime<Utc>,
}

impl SecurityEvent {
    /// 创建新的安全事件
    pub fn new(event_type: EventType, severity: EventSeverity) -> Self {
        Self {
            id: generate_event_id(),
            event_type,
            severity,
            contact: None,
            method: None,
            message: None,
            details: HashMap::new(),
            timestamp: Utc::now(),
        }
    }

    /// 创建自定义事件
    pub fn custom(name: impl Into<String>, severity: EventSeverity) -> Self {
        Self::new(EventType::Custom(name.into()), severity)
    }

    // ========================================================================
    // 便捷构造方法
    // ========================================================================

    /// OTP 发送事件
    pub fn otp_sent(contact: impl Into<String>, method: DeliveryMethod) -> Self {
        Self::new(EventType::OtpSent, EventSeverity::Info)
            .with_target(contact, method)
            .with_message("OTP sent")
    }

    /// OTP 验证成功事件
    pub fn otp_verified(contact: impl Into<String>, method: DeliveryMethod) -> Self {
        Self::new(EventType::OtpVerified, EventSeverity::Info)
            .with_target(contact, method)
            .with_message("OTP verified")
    }

    /// OTP 验证失败事件
    pub fn otp_failed(
        contact: impl Into<String>,
        method: DeliveryMethod,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(EventType::OtpFailed, EventSeverity::Warning)
            .with_target(contact, method)
            .with_message(format!("OTP verification failed: {}", reason.into()))
    }

    /// OTP 过期事件
    pub fn otp_expired(contact: impl Into<String>, method: DeliveryMethod) -> Self {
        Self::new(EventType::OtpExpired, EventSeverity::Warning)
            .with_target(contact, method)
            .with_message("OTP expired")
    }

    /// 尝试次数耗尽事件
    pub fn otp_locked(contact: impl Into<String>, method: DeliveryMethod, attempts: u32) -> Self {
        Self::new(EventType::OtpLocked, EventSeverity::Warning)
            .with_target(contact, method)
            .with_detail("attempts", attempts.to_string())
            .with_message("OTP locked after maximum attempts")
    }

    /// OTP 投递失败事件
    pub fn otp_delivery_failed(
        contact: impl Into<String>,
        method: DeliveryMethod,
        reason: impl Into<String>,
    ) -> Self {
        Self::new(EventType::OtpDeliveryFailed, EventSeverity::Error)
            .with_target(contact, method)
            .with_message(format!("OTP delivery failed: {}", reason.into()))
    }

    /// OTP 撤销事件
    pub fn otp_revoked(contact: impl Into<String>, method: DeliveryMethod) -> Self {
        Self::new(EventType::OtpRevoked, EventSeverity::Info)
            .with_target(contact, method)
            .with_message("OTP revoked")
    }

    // ========================================================================
    // Builder 方法
    // ========================================================================

    /// 设置联系方式与渠道
    pub fn with_target(mut self, contact: impl Into<String>, method: DeliveryMethod) -> Self {
        self.contact = Some(contact.into());
        self.method = Some(method);
        self
    }

    /// 设置消息
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// 添加详情
    pub fn with_detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.insert(key.into(), value.into());
        self
    }

    /// 设置严重程度
    pub fn with_severity(mut self, severity: EventSeverity) -> Self {
        self.severity = severity;
        self
    }

    /// 设置事件时间
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    // ========================================================================
    // 查询方法
    // ========================================================================

    /// 获取事件类型名称
    pub fn event_name(&self) -> String {
        self.event_type.to_string()
    }

    /// 检查是否是高严重程度事件
    pub fn is_high_severity(&self) -> bool {
        matches!(
            self.severity,
            EventSeverity::Error | EventSeverity::Critical
        )
    }
}

fn generate_event_id() -> String {
    use crate::random::generate_random_hex;
    format!(
        "evt_{}",
        generate_random_hex(16).unwrap_or_else(|_| "unknown".to_string())
    )
}

// ============================================================================
// AuditLogger Trait
// ============================================================================

/// 审计日志记录器 trait
pub trait AuditLogger: Send + Sync {
    /// 记录安全事件
    fn log(&self, event: SecurityEvent);

    /// 批量记录事件
    fn log_batch(&self, events: Vec<SecurityEvent>) {
        for event in events {
            self.log(event);
        }
    }
}

// ============================================================================
// InMemoryAuditLogger
// ============================================================================

/// 内存审计日志记录器
///
/// 用于测试和开发环境，将事件存储在内存中
#[derive(Debug, Default)]
pub struct InMemoryAuditLogger {
    events: Arc<RwLock<Vec<SecurityEvent>>>,
    max_events: Option<usize>,
}

impl InMemoryAuditLogger {
    /// 创建新的内存日志记录器
    pub fn new() -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            max_events: None,
        }
    }

    /// 创建带有最大事件数限制的日志记录器
    pub fn with_max_events(max: usize) -> Self {
        Self {
            events: Arc::new(RwLock::new(Vec::new())),
            max_events: Some(max),
        }
    }

    fn filtered(&self, predicate: impl Fn(&SecurityEvent) -> bool) -> Vec<SecurityEvent> {
        self.events
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|e| predicate(*e))
            .cloned()
            .collect()
    }

    /// 获取所有事件
    pub fn get_events(&self) -> Vec<SecurityEvent> {
        self.filtered(|_| true)
    }

    /// 获取事件数量
    pub fn event_count(&self) -> usize {
        self.events.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// 按联系方式获取事件
    pub fn get_events_by_contact(&self, contact: &str) -> Vec<SecurityEvent> {
        self.filtered(|e| e.contact.as_deref() == Some(contact))
    }

    /// 按事件类型获取事件
    pub fn get_events_by_type(&self, event_type: &EventType) -> Vec<SecurityEvent> {
        self.filtered(|e| &e.event_type == event_type)
    }

    /// 按严重程度获取事件
    pub fn get_events_by_severity(&self, severity: EventSeverity) -> Vec<SecurityEvent> {
        self.filtered(|e| e.severity == severity)
    }

    /// 获取时间范围内的事件
    pub fn get_events_in_range(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<SecurityEvent> {
        self.filtered(|e| e.timestamp >= start && e.timestamp <= end)
    }

    /// 获取最近 N 个事件（最新的在前）
    pub fn get_recent_events(&self, count: usize) -> Vec<SecurityEvent> {
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        events.iter().rev().take(count).cloned().collect()
    }

    /// 获取高严重程度事件
    pub fn get_high_severity_events(&self) -> Vec<SecurityEvent> {
        self.filtered(SecurityEvent::is_high_severity)
    }

    /// 清空所有事件
    pub fn clear(&self) {
        self.events
            .write()
            .unwrap_or_else(|e| e.into_inner())
            .clear();
    }

    /// 获取统计信息
    pub fn get_stats(&self) -> AuditStats {
        let events = self.events.read().unwrap_or_else(|e| e.into_inner());
        let mut stats = AuditStats {
            total_events: events.len(),
            ..Default::default()
        };

        for event in events.iter() {
            match event.severity {
                EventSeverity::Debug => stats.debug_count += 1,
                EventSeverity::Info => stats.info_count += 1,
                EventSeverity::Warning => stats.warning_count += 1,
                EventSeverity::Error => stats.error_count += 1,
                EventSeverity::Critical => stats.critical_count += 1,
            }

            *stats.events_by_type.entry(event.event_name()).or_insert(0) += 1;
        }

        stats
    }
}

impl AuditLogger for InMemoryAuditLogger {
    fn log(&self, event: SecurityEvent) {
        let mut events = self.events.write().unwrap_or_else(|e| e.into_inner());

        // 超过上限时丢弃最旧的事件
        if let Some(max) = self.max_events {
            while !events.is_empty() && events.len() >= max {
                events.remove(0);
            }
        }

        events.push(event);
    }
}

impl Clone for InMemoryAuditLogger {
    fn clone(&self) -> Self {
        Self {
            events: Arc::clone(&self.events),
            max_events: self.max_events,
        }
    }
}

/// 审计统计信息
#[derive(Debug, Default, Clone)]
pub struct AuditStats {
    /// 总事件数
    pub total_events: usize,
    /// Debug 级别事件数
    pub debug_count: usize,
    /// Info 级别事件数
    pub info_count: usize,
    /// Warning 级别事件数
    pub warning_count: usize,
    /// Error 级别事件数
    pub error_count: usize,
    /// Critical 级别事件数
    pub critical_count: usize,
    /// 按类型统计
    pub events_by_type: HashMap<String, usize>,
}

// ============================================================================
// NoOpAuditLogger
// ============================================================================

/// 空操作日志记录器
///
/// `OtpService` 未配置审计时的默认值
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpAuditLogger;

impl NoOpAuditLogger {
    pub fn new() -> Self {
        Self
    }
}

impl AuditLogger for NoOpAuditLogger {
    fn log(&self, _event: SecurityEvent) {}
}

// ============================================================================
// 测试
// ============================================================================
