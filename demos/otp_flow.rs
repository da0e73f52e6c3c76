//! OTP 验证流程示例
//!
//! 展示如何使用 otpkit 完成一次邮箱验证：签发、输错一次、输入正确验证码，
//! 以及短信渠道的锁定与重发。
//!
//! 运行: RUST_LOG=otpkit=debug cargo run --example otp_flow

use async_trait::async_trait;
use otpkit::audit::InMemoryAuditLogger;
use otpkit::contact::{mask_contact, validate_contact};
use otpkit::{
    DeliveryError, DeliveryMethod, DeliverySender, OtpConfig, OtpResponse, OtpService,
    SimulatedSender,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tracing_subscriber::EnvFilter;

/// 模拟用户收件箱
///
/// 先交给 [`SimulatedSender`] 模拟网络延迟，再把验证码放进“收件箱”，
/// 相当于用户在邮件/短信里看到了验证码。
struct Inbox {
    transport: SimulatedSender,
    last_code: Mutex<Option<String>>,
}

impl Inbox {
    fn new() -> Self {
        Self {
            transport: SimulatedSender::new().with_latency(Duration::from_millis(300)),
            last_code: Mutex::new(None),
        }
    }

    fn read(&self) -> String {
        self.last_code
            .lock()
            .unwrap()
            .clone()
            .unwrap_or_default()
    }
}

#[async_trait]
impl DeliverySender for Inbox {
    async fn send(
        &self,
        contact: &str,
        method: DeliveryMethod,
        code: &str,
    ) -> Result<(), DeliveryError> {
        self.transport.send(contact, method, code).await?;
        *self.last_code.lock().unwrap() = Some(code.to_string());
        Ok(())
    }
}

fn show(step: &str, response: &OtpResponse) {
    let mark = if response.success { "✅" } else { "❌" };
    println!("   {} {}: {}", mark, step, response.message);
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("otpkit=info")),
        )
        .init();

    println!("=== otpkit OTP 验证示例 ===\n");

    let inbox = Arc::new(Inbox::new());
    let audit = InMemoryAuditLogger::new();
    let service = OtpService::builder()
        .config(OtpConfig::default().with_resend_cooldown(Some(Duration::from_secs(60))))
        .sender(Arc::clone(&inbox))
        .audit_logger(audit.clone())
        .build()
        .expect("default config is valid");

    // ===== 邮箱验证 =====
    let email = "alice@example.com";
    println!("📧 邮箱验证: {}", mask_contact(email, DeliveryMethod::Email));

    if let Err(e) = validate_contact(email, DeliveryMethod::Email) {
        println!("   联系方式无效: {}", e);
        return;
    }

    let response = OtpResponse::from(service.issue(email, DeliveryMethod::Email).await);
    show("签发", &response);

    let response = OtpResponse::from(
        service
            .verify(email, DeliveryMethod::Email, "000000")
            .await,
    );
    show("输入 000000", &response);

    let code = inbox.read();
    let response = OtpResponse::from(service.verify(email, DeliveryMethod::Email, &code).await);
    show("输入收到的验证码", &response);

    // 冷却期内重发
    let response = OtpResponse::from(service.issue(email, DeliveryMethod::Email).await);
    show("立即重发", &response);

    // ===== 短信锁定 =====
    let phone = "+15551234567";
    println!("\n📱 短信验证: {}", mask_contact(phone, DeliveryMethod::Sms));

    let response = OtpResponse::from(service.issue(phone, DeliveryMethod::Sms).await);
    show("签发", &response);

    for guess in ["111111", "222222", "333333"] {
        let response = OtpResponse::from(service.verify(phone, DeliveryMethod::Sms, guess).await);
        show(&format!("输入 {}", guess), &response);
    }

    let code = inbox.read();
    let response = OtpResponse::from(service.verify(phone, DeliveryMethod::Sms, &code).await);
    show("锁定后输入正确验证码", &response);

    if let Ok(Some(status)) = service.status(phone, DeliveryMethod::Sms) {
        println!(
            "   状态: {:?}，已用 {} 次，剩余 {} 次",
            status.state, status.attempts_used, status.attempts_remaining
        );
    }

    // ===== 审计日志 =====
    println!("\n📋 审计事件:");
    for event in audit.get_events() {
        println!(
            "   [{}] {} {}",
            event.severity,
            event.event_name(),
            event.message.unwrap_or_default()
        );
    }

    let stats = audit.get_stats();
    println!(
        "\n   共 {} 条，警告 {} 条，错误 {} 条",
        stats.total_events, stats.warning_count, stats.error_count
    );
}
