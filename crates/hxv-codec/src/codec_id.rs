//! 编解码器标识符.

use hxv_core::MediaType;
use std::fmt;

/// 编解码器标识符
///
/// 唯一标识一种编解码算法, 与容器格式无关.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum CodecId {
    /// 未知编解码器
    None,
    /// H.264 / AVC (HX 的 .264 变体, 尚未支持解析)
    H264,
    /// H.265 / HEVC
    H265,
    /// G.711 A-law
    PcmAlaw,
    /// PCM 有符号 16 位小端
    PcmS16le,
}

impl CodecId {
    /// 获取编解码器所属的媒体类型
    pub const fn media_type(&self) -> Option<MediaType> {
        match self {
            Self::H264 | Self::H265 => Some(MediaType::Video),
            Self::PcmAlaw | Self::PcmS16le => Some(MediaType::Audio),
            Self::None => None,
        }
    }

    /// 获取编解码器名称 (与 FFmpeg 命名一致)
    pub const fn name(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::H264 => "h264",
            Self::H265 => "hevc",
            Self::PcmAlaw => "pcm_alaw",
            Self::PcmS16le => "pcm_s16le",
        }
    }
}

impl fmt::Display for CodecId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}
