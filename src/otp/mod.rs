//! 一次性验证码 (OTP) 模块
//!
//! 服务端生成随机数字验证码，通过邮件/短信发送给用户，再校验用户输入。
//!
//! ## 工作流程
//!
//! 1. 用户输入邮箱或手机号，选择投递渠道
//! 2. [`OtpService::issue`] 生成验证码并交给 [`DeliverySender`](crate::delivery::DeliverySender)
//! 3. 投递成功后记录写入存储，按 `(contact, method)` 索引
//! 4. 用户输入收到的验证码
//! 5. [`OtpService::verify`] 检查记录是否存在、是否锁定、是否过期，然后比对
//!
//! ## 记录状态
//!
//! ```text
//!            verify(正确)
//!   Active ───────────────► Verified
//!     │  \
//!     │   \ 尝试次数耗尽
//!     │    └──────────────► Locked（直到重新签发）
//!     │
//!     └ 验证时发现过期 ───► 删除（之后视为不存在）
//! ```
//!
//! ## 安全考虑
//!
//! - 验证码比较使用常量时间比较
//! - 过期在访问时惰性判断，没有后台定时器
//! - 同一 `(contact, method)` 上的签发与验证串行执行
//! - 日志中联系方式脱敏，验证码只出现在 TRACE 级别

pub mod config;
pub mod generator;
pub mod response;
pub mod service;
pub mod store;

pub use config::{OtpConfig, OtpSettings, ReverifyPolicy};
pub use generator::{CodeGenerator, FixedCodeGenerator, RandomCodeGenerator, SequenceCodeGenerator};
pub use response::{GENERIC_FAILURE_MESSAGE, OtpResponse};
pub use service::{IssuedOtp, OtpService, OtpServiceBuilder, OtpState, OtpStatus, Verification};
pub use store::{InMemoryOtpStore, OtpKey, OtpRecord, OtpStore};
