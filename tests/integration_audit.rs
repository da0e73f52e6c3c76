//! 集成测试：审计日志
//!
//! 测试 OTP 安全事件的记录、查询、过滤，以及服务在各个流程中产生的事件。

use chrono::{Duration, Utc};
use otpkit::audit::{
    AuditLogger, EventSeverity, EventType, InMemoryAuditLogger, NoOpAuditLogger, SecurityEvent,
};
use otpkit::clock::ManualClock;
use otpkit::otp::FixedCodeGenerator;
use otpkit::{DeliveryMethod, OtpConfig, OtpService};

/// 测试安全事件创建
#[test]
fn test_security_event_creation() {
    let sent = SecurityEvent::otp_sent("user@example.com", DeliveryMethod::Email);
    assert_eq!(sent.event_type, EventType::OtpSent);
    assert_eq!(sent.severity, EventSeverity::Info);
    assert_eq!(sent.contact, Some("user@example.com".to_string()));
    assert_eq!(sent.method, Some(DeliveryMethod::Email));

    let failed = SecurityEvent::otp_failed("+15551234567", DeliveryMethod::Sms, "OTP expired");
    assert_eq!(failed.event_type, EventType::OtpFailed);
    assert_eq!(failed.severity, EventSeverity::Warning);
    assert_eq!(
        failed.message,
        Some("OTP verification failed: OTP expired".to_string())
    );

    let locked = SecurityEvent::otp_locked("user@example.com", DeliveryMethod::Email, 3);
    assert_eq!(locked.event_type, EventType::OtpLocked);
    assert_eq!(locked.details.get("attempts"), Some(&"3".to_string()));

    let delivery = SecurityEvent::otp_delivery_failed(
        "user@example.com",
        DeliveryMethod::Email,
        "smtp timeout",
    );
    assert_eq!(delivery.severity, EventSeverity::Error);
    assert!(delivery.is_high_severity());
}

/// 测试事件构建器模式
#[test]
fn test_security_event_builder() {
    let event = SecurityEvent::new(EventType::OtpVerified, EventSeverity::Info)
        .with_target("user@example.com", DeliveryMethod::Email)
        .with_message("User verified their email")
        .with_detail("source", "signup_form")
        .with_severity(EventSeverity::Debug)
        .with_timestamp(chrono::DateTime::<Utc>::UNIX_EPOCH);

    assert_eq!(event.contact, Some("user@example.com".to_string()));
    assert_eq!(event.timestamp.timestamp(), 0);
    assert_eq!(event.severity, EventSeverity::Debug);
    assert_eq!(
        event.message,
        Some("User verified their email".to_string())
    );
    assert_eq!(
        event.details.get("source"),
        Some(&"signup_form".to_string())
    );
    assert!(event.id.starts_with("evt_"));
}

/// 测试内存审计日志器的查询
#[test]
fn test_in_memory_audit_logger() {
    let logger = InMemoryAuditLogger::new();

    logger.log(SecurityEvent::otp_sent("a@example.com", DeliveryMethod::Email));
    logger.log(SecurityEvent::otp_failed(
        "a@example.com",
        DeliveryMethod::Email,
        "Invalid OTP. 2 attempts remaining",
    ));
    logger.log(SecurityEvent::otp_sent("+15551234567", DeliveryMethod::Sms));
    logger.log(SecurityEvent::otp_delivery_failed(
        "+15551234567",
        DeliveryMethod::Sms,
        "gateway down",
    ));

    assert_eq!(logger.event_count(), 4);
    assert_eq!(logger.get_events_by_contact("a@example.com").len(), 2);
    assert_eq!(logger.get_events_by_type(&EventType::OtpSent).len(), 2);
    assert_eq!(
        logger.get_events_by_severity(EventSeverity::Warning).len(),
        1
    );
    assert_eq!(logger.get_high_severity_events().len(), 1);

    let recent = logger.get_recent_events(2);
    assert_eq!(recent[0].event_type, EventType::OtpDeliveryFailed);
    assert_eq!(recent[1].event_type, EventType::OtpSent);

    logger.clear();
    assert_eq!(logger.event_count(), 0);
}

/// 测试时间范围查询
#[test]
fn test_events_in_range() {
    let logger = InMemoryAuditLogger::new();
    logger.log(SecurityEvent::otp_sent("a@example.com", DeliveryMethod::Email));

    let now = Utc::now();
    let in_range = logger.get_events_in_range(now - Duration::minutes(1), now + Duration::minutes(1));
    assert_eq!(in_range.len(), 1);

    let before = logger.get_events_in_range(now - Duration::hours(2), now - Duration::hours(1));
    assert!(before.is_empty());
}

/// 测试事件数上限
#[test]
fn test_max_events() {
    let logger = InMemoryAuditLogger::with_max_events(3);
    for i in 0..5 {
        logger.log(SecurityEvent::otp_sent(
            format!("user{}@example.com", i),
            DeliveryMethod::Email,
        ));
    }

    let events = logger.get_events();
    assert_eq!(events.len(), 3);
    assert_eq!(events[0].contact, Some("user2@example.com".to_string()));
}

/// 测试统计信息
#[test]
fn test_audit_stats() {
    let logger = InMemoryAuditLogger::new();
    logger.log_batch(vec![
        SecurityEvent::otp_sent("a@example.com", DeliveryMethod::Email),
        SecurityEvent::otp_verified("a@example.com", DeliveryMethod::Email),
        SecurityEvent::otp_expired("b@example.com", DeliveryMethod::Email),
        SecurityEvent::custom("manual_review", EventSeverity::Critical),
    ]);

    let stats = logger.get_stats();
    assert_eq!(stats.total_events, 4);
    assert_eq!(stats.info_count, 2);
    assert_eq!(stats.warning_count, 1);
    assert_eq!(stats.critical_count, 1);
    assert_eq!(stats.events_by_type.get("otp_sent"), Some(&1));
    assert_eq!(stats.events_by_type.get("custom:manual_review"), Some(&1));
}

/// 测试空操作日志器
#[test]
fn test_noop_logger() {
    let logger = NoOpAuditLogger::new();
    logger.log(SecurityEvent::otp_sent("a@example.com", DeliveryMethod::Email));
}

/// 测试事件序列化
#[test]
fn test_event_serialization() {
    let event = SecurityEvent::otp_sent("a@example.com", DeliveryMethod::Email);
    let json = serde_json::to_string(&event).unwrap();
    assert!(json.contains("\"method\":\"email\""));

    let parsed: SecurityEvent = serde_json::from_str(&json).unwrap();
    assert_eq!(parsed.event_type, EventType::OtpSent);
    assert_eq!(parsed.id, event.id);
}

/// 测试服务在完整流程中产生的事件
#[tokio::test]
async fn test_service_audit_trail() {
    let clock = ManualClock::at_epoch();
    let logger = InMemoryAuditLogger::new();
    let service = OtpService::builder()
        .clock(clock.clone())
        .generator(FixedCodeGenerator::new("424242"))
        .audit_logger(logger.clone())
        .build()
        .unwrap();

    let email = DeliveryMethod::Email;
    service.issue("a@example.com", email).await.unwrap();
    let _ = service.verify("a@example.com", email, "000000").await;
    service.verify("a@example.com", email, "424242").await.unwrap();

    service.issue("b@example.com", email).await.unwrap();
    clock.advance(std::time::Duration::from_secs(301));
    let _ = service.verify("b@example.com", email, "424242").await;
    let _ = service.verify("b@example.com", email, "424242").await;

    service.issue("c@example.com", email).await.unwrap();
    service.revoke("c@example.com", email).await.unwrap();

    let names: Vec<String> = logger.get_events().iter().map(|e| e.event_name()).collect();
    assert_eq!(
        names,
        vec![
            "otp_sent",
            "otp_failed",
            "otp_verified",
            "otp_sent",
            "otp_expired",
            "otp_failed",
            "otp_sent",
            "otp_revoked",
        ]
    );

    let b_events = logger.get_events_by_contact("b@example.com");
    assert_eq!(
        b_events.last().and_then(|e| e.message.clone()),
        Some("OTP verification failed: OTP not found or expired".to_string())
    );
}

/// 测试锁定事件只记录一次
#[tokio::test]
async fn test_lockout_logged_once() {
    let logger = InMemoryAuditLogger::new();
    let service = OtpService::builder()
        .config(OtpConfig::default().with_max_attempts(2))
        .generator(FixedCodeGenerator::new("424242"))
        .audit_logger(logger.clone())
        .build()
        .unwrap();

    service
        .issue("+15551234567", DeliveryMethod::Sms)
        .await
        .unwrap();
    for _ in 0..4 {
        let _ = service
            .verify("+15551234567", DeliveryMethod::Sms, "000000")
            .await;
    }

    let locked = logger.get_events_by_type(&EventType::OtpLocked);
    assert_eq!(locked.len(), 1);
    assert_eq!(locked[0].details.get("attempts"), Some(&"2".to_string()));
    assert_eq!(logger.get_events_by_type(&EventType::OtpFailed).len(), 4);
}
