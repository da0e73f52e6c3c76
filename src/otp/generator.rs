//! 验证码生成器

use std::collections::VecDeque;
use std::sync::Mutex;

use crate::error::{Error, Result};
use crate::random::generate_numeric_code;

/// 验证码生成接口
///
/// 默认实现基于 `rand` 的线程 RNG；需要更强保证的部署可以替换为自己的
/// 实现，`OtpService` 的行为不受影响。
pub trait CodeGenerator: Send + Sync {
    /// 生成 `length` 位数字验证码
    fn generate(&self, length: usize) -> Result<String>;
}

/// 随机数字验证码
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomCodeGenerator;

impl CodeGenerator for RandomCodeGenerator {
    fn generate(&self, length: usize) -> Result<String> {
        if !(1..=19).contains(&length) {
            return Err(Error::internal(format!(
                "cannot generate a {}-digit numeric code",
                length
            )));
        }
        Ok(generate_numeric_code(length))
    }
}

/// 始终返回同一个验证码
///
/// 用于测试与演示。
#[derive(Debug, Clone)]
pub struct FixedCodeGenerator {
    code: String,
}

impl FixedCodeGenerator {
    pub fn new(code: impl Into<String>) -> Self {
        Self { code: code.into() }
    }
}

impl CodeGenerator for FixedCodeGenerator {
    fn generate(&self, _length: usize) -> Result<String> {
        Ok(self.code.clone())
    }
}

/// 依次返回预设的验证码，用完后报错
#[derive(Debug, Default)]
pub struct SequenceCodeGenerator {
    codes: Mutex<VecDeque<String>>,
}

impl SequenceCodeGenerator {
    pub fn new<I, S>(codes: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            codes: Mutex::new(codes.into_iter().map(Into::into).collect()),
        }
    }
}

impl CodeGenerator for SequenceCodeGenerator {
    fn generate(&self, _length: usize) -> Result<String> {
        self.codes
            .lock()
            .map_err(|_| Error::internal("code sequence lock poisoned"))?
            .pop_front()
            .ok_or_else(|| Error::internal("code sequence exhausted"))
    }
}
