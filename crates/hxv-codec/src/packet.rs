//! 压缩数据包 (Packet).
//!
//! 解封装器输出、封装器输入的基本单位. HX 录像中一个视频 Packet 对应一个
//! 完整的 H.265 访问单元, 一个音频 Packet 对应一个音频块解码后的 PCM 数据.

use bytes::Bytes;
use hxv_core::Rational;

/// 数据包
#[derive(Debug, Clone)]
pub struct Packet {
    /// 负载数据
    pub data: Bytes,
    /// 显示时间戳 (PTS)
    pub pts: i64,
    /// 解码时间戳 (DTS)
    pub dts: i64,
    /// 数据包时长 (以 time_base 为单位, None 表示未知)
    pub duration: Option<i64>,
    /// 时间基
    pub time_base: Rational,
    /// 所属流的索引
    pub stream_index: usize,
    /// 是否为关键帧
    pub is_keyframe: bool,
    /// 在容器中的字节偏移量 (-1 表示未知)
    pub pos: i64,
}

impl Packet {
    /// 创建空数据包
    pub fn empty() -> Self {
        Self {
            data: Bytes::new(),
            pts: hxv_core::timestamp::NOPTS_VALUE,
            dts: hxv_core::timestamp::NOPTS_VALUE,
            duration: None,
            time_base: Rational::UNDEFINED,
            stream_index: 0,
            is_keyframe: false,
            pos: -1,
        }
    }

    /// 从数据创建数据包
    pub fn from_data(data: impl Into<Bytes>) -> Self {
        Self {
            data: data.into(),
            ..Self::empty()
        }
    }

    /// 数据大小 (字节)
    pub fn size(&self) -> usize {
        self.data.len()
    }

    /// 是否为空包
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }
}
