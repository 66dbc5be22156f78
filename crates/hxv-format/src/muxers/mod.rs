//! 封装器实现模块.
//!
//! 目前只有 Matroska. MP4 与 MPEG-TS 可以被识别, 但没有注册封装器,
//! 请求这两种格式会得到 `HxError::UnsupportedFormat`.

pub mod mkv;

use crate::format_id::FormatId;
use crate::registry::FormatRegistry;

/// 注册所有内置封装器
pub fn register_all_muxers(registry: &mut FormatRegistry) {
    registry.register_muxer(FormatId::Matroska, "matroska", mkv::MkvMuxer::create);
}
