//! # hxv-core
//!
//! HX 录像解析框架核心库, 提供基础类型定义与统一错误处理.
//!
//! 其余 crate (编解码、容器格式、命令行) 均依赖本 crate.

pub mod error;
pub mod media_type;
pub mod rational;
pub mod sample_format;
pub mod timestamp;

// 重导出常用类型
pub use error::{HxError, HxResult};
pub use media_type::MediaType;
pub use rational::Rational;
pub use sample_format::SampleFormat;
pub use timestamp::Timestamp;
