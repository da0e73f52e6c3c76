//! 随机数生成模块
//!
//! 提供验证码、事件 ID 等所需的随机数生成，以及常量时间比较。

use rand::{Rng, TryRngCore, rngs::OsRng};

use crate::error::{CryptoError, Error, Result};

/// 生成指定长度的随机字节数组
///
/// 使用操作系统提供的随机数生成器
///
/// # Example
///
/// ```rust
/// use otpkit::random::generate_random_bytes;
///
/// let bytes = generate_random_bytes(16).unwrap();
/// assert_eq!(bytes.len(), 16);
/// ```
pub fn generate_random_bytes(length: usize) -> Result<Vec<u8>> {
    let mut bytes = vec![0u8; length];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| Error::Crypto(CryptoError::RngFailed(format!("{:?}", e))))?;
    Ok(bytes)
}

/// 生成指定长度的十六进制随机字符串
///
/// 最终字符串长度为字节数的两倍。
///
/// ```rust
/// use otpkit::random::generate_random_hex;
///
/// let hex = generate_random_hex(8).unwrap();
/// assert_eq!(hex.len(), 16);
/// ```
pub fn generate_random_hex(byte_length: usize) -> Result<String> {
    let bytes = generate_random_bytes(byte_length)?;
    Ok(hex_encode(&bytes))
}

/// 生成指定范围内的随机数
///
/// # Arguments
///
/// * `min` - 最小值（包含）
/// * `max` - 最大值（不包含）
pub fn generate_random_in_range(min: u64, max: u64) -> u64 {
    rand::rng().random_range(min..max)
}

/// 生成指定位数的数字验证码
///
/// 首位不为 0，与常见的短信/邮件验证码形态一致（6 位时范围为
/// `100000..=999999`）。
///
/// # Panics
///
/// `digits` 为 0 或大于 19 时 panic（超出 `u64` 可表示范围）。
///
/// ```rust
/// use otpkit::random::generate_numeric_code;
///
/// let code = generate_numeric_code(6);
/// assert_eq!(code.len(), 6);
/// assert!(code.chars().all(|c| c.is_ascii_digit()));
/// ```
pub fn generate_numeric_code(digits: usize) -> String {
    assert!(
        (1..=19).contains(&digits),
        "numeric code must have between 1 and 19 digits"
    );
    let min = 10u64.pow((digits - 1) as u32);
    let max = 10u64.pow(digits as u32);
    let code = generate_random_in_range(min, max);
    format!("{:0>width$}", code, width = digits)
}

// ============================================================================
// 辅助函数
// ============================================================================

fn hex_encode(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{:02x}", b)).collect()
}

/// 常量时间比较两个字节切片
///
/// 用于防止时序攻击
///
/// ```rust
/// use otpkit::random::constant_time_compare;
///
/// assert!(constant_time_compare(b"123456", b"123456"));
/// assert!(!constant_time_compare(b"123456", b"654321"));
/// ```
pub fn constant_time_compare(a: &[u8], b: &[u8]) -> bool {
    use subtle::ConstantTimeEq;
    a.ct_eq(b).into()
}

/// 常量时间比较两个字符串
pub fn constant_time_compare_str(a: &str, b: &str) -> bool {
    constant_time_compare(a.as_bytes(), b.as_bytes())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_random_bytes() {
        let bytes = generate_random_bytes(32).unwrap();
        assert_eq!(bytes.len(), 32);

        let bytes2 = generate_random_bytes(32).unwrap();
        assert_ne!(bytes, bytes2);
    }

    #[test]
    fn test_generate_random_hex() {
        let hex = generate_random_hex(16).unwrap();
        assert_eq!(hex.len(), 32);
        assert!(hex.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn test_generate_random_in_range() {
        for _ in 0..100 {
            let val = generate_random_in_range(10, 20);
            assert!((10..20).contains(&val));
        }
    }

    #[test]
    fn test_generate_numeric_code() {
        for digits in [4, 6, 8, 10] {
            let code = generate_numeric_code(digits);
            assert_eq!(code.len(), digits);
            assert!(code.chars().all(|c| c.is_ascii_digit()));
            assert_ne!(code.chars().next(), Some('0'));
        }
    }

    #[test]
    #[should_panic]
    fn test_generate_numeric_code_zero_digits() {
        generate_numeric_code(0);
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare(b"hello", b"hello"));
        assert!(!constant_time_compare(b"hello", b"world"));
        assert!(!constant_time_compare(b"hello", b"hell"));
    }

    #[test]
    fn test_constant_time_compare_str() {
        assert!(constant_time_compare_str("123456", "123456"));
        assert!(!constant_time_compare_str("123456", "12345"));
        assert!(!constant_time_compare_str("123456", ""));
    }

    #[test]
    fn test_hex_encode() {
        assert_eq!(hex_encode(&[0x00, 0xff, 0x10]), "00ff10");
        assert_eq!(hex_encode(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
    }
}
