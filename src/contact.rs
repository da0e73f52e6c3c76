//! 联系方式辅助函数
//!
//! `OtpService` 本身不校验联系方式格式，这部分属于调用方（表单层）的
//! 职责。本模块提供调用方常用的检查：
//!
//! - 邮箱格式：`local@domain.tld`，不含空白，只有一个 `@`
//! - 手机号格式：去掉空格、`-`、`(`、`)` 后，可选 `+` 开头，首位 1-9，共 4-15 位数字
//! - 用户输入的验证码是否为指定位数的纯数字
//! - 日志中使用的脱敏显示
//!
//! ```rust
//! use otpkit::contact::{validate_contact, is_well_formed_code};
//! use otpkit::DeliveryMethod;
//!
//! assert!(validate_contact("user@example.com", DeliveryMethod::Email).is_ok());
//! assert!(validate_contact("+1 (555) 123-4567", DeliveryMethod::Sms).is_ok());
//! assert!(validate_contact("not-a-phone", DeliveryMethod::Sms).is_err());
//!
//! assert!(is_well_formed_code("042917", 6));
//! assert!(!is_well_formed_code("42917", 6));
//! ```

use crate::delivery::DeliveryMethod;
use crate::error::ValidationError;

/// 检查邮箱格式
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };

    if local.is_empty() || domain.contains('@') {
        return false;
    }
    if email.chars().any(char::is_whitespace) {
        return false;
    }

    // 域名中至少有一个不在首尾的点
    domain
        .char_indices()
        .any(|(i, c)| c == '.' && i > 0 && i + 1 < domain.len())
}

/// 检查手机号格式
///
/// 允许常见的分隔符：空白、`-`、`(`、`)`。
pub fn is_valid_phone(phone: &str) -> bool {
    let normalized = normalize_phone(phone);
    let digits = normalized.strip_prefix('+').unwrap_or(&normalized);

    if !(4..=15).contains(&digits.len()) || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }

    !digits.starts_with('0')
}

/// 去掉手机号中的分隔符
pub fn normalize_phone(phone: &str) -> String {
    phone
        .chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '-' | '(' | ')'))
        .collect()
}

/// 按渠道校验联系方式
///
/// # Errors
///
/// - 联系方式为空（去除首尾空白后）
/// - 邮箱/手机号格式不符合对应渠道
pub fn validate_contact(contact: &str, method: DeliveryMethod) -> Result<(), ValidationError> {
    let contact = contact.trim();
    if contact.is_empty() {
        return Err(ValidationError::EmptyField("contact".to_string()));
    }

    match method {
        DeliveryMethod::Email if !is_valid_email(contact) => {
            Err(ValidationError::InvalidEmail(contact.to_string()))
        }
        DeliveryMethod::Sms if !is_valid_phone(contact) => {
            Err(ValidationError::InvalidPhone(contact.to_string()))
        }
        _ => Ok(()),
    }
}

/// 检查输入是否为 `length` 位纯数字
///
/// 供表单层在提交前过滤明显错误的输入；验证器本身接受任意字符串。
pub fn is_well_formed_code(input: &str, length: usize) -> bool {
    input.len() == length && input.bytes().all(|b| b.is_ascii_digit())
}

/// 脱敏显示联系方式
///
/// - 邮箱：保留本地部分首字符和完整域名，`alice@example.com` → `a***@example.com`
/// - 手机号：保留 `+` 与末两位，`+15551234567` → `+*********67`
pub fn mask_contact(contact: &str, method: DeliveryMethod) -> String {
    match method {
        DeliveryMethod::Email => match contact.split_once('@') {
            Some((local, domain)) => {
                let first: String = local.chars().take(1).collect();
                format!("{}***@{}", first, domain)
            }
            None => mask_tail(contact, 0),
        },
        DeliveryMethod::Sms => {
            let (prefix, rest) = match contact.strip_prefix('+') {
                Some(rest) => ("+", rest),
                None => ("", contact),
            };
            format!("{}{}", prefix, mask_tail(rest, 2))
        }
    }
}

/// 除末尾 `keep` 个字符外全部替换为 `*`
fn mask_tail(value: &str, keep: usize) -> String {
    let count = value.chars().count();
    if count <= keep {
        return "*".repeat(count);
    }
    let visible: String = value.chars().skip(count - keep).collect();
    format!("{}{}", "*".repeat(count - keep), visible)
}
