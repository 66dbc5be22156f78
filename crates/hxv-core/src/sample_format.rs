//! 音频采样格式定义.

use std::fmt;

/// 音频采样格式 (交错)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SampleFormat {
    /// 未指定
    None,
    /// 无符号 8 位整数
    U8,
    /// 有符号 16 位整数
    S16,
}

impl SampleFormat {
    /// 每个采样点占用的字节数
    pub const fn bytes_per_sample(&self) -> u32 {
        match self {
            Self::None => 0,
            Self::U8 => 1,
            Self::S16 => 2,
        }
    }
}

impl fmt::Display for SampleFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::None => "none",
            Self::U8 => "u8",
            Self::S16 => "s16",
        };
        write!(f, "{name}")
    }
}
