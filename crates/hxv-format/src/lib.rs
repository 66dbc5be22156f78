//! # hxv-format
//!
//! HX 录像解析框架的容器格式库, 提供 I/O 抽象、解封装/封装框架、
//! HX 解封装器与 Matroska 封装器.

pub mod demuxer;
pub mod demuxers;
pub mod format_id;
pub mod io;
pub mod muxer;
pub mod muxers;
pub mod probe;
pub mod registry;
pub mod stream;

// 重导出常用类型
pub use demuxer::Demuxer;
pub use demuxers::hx::{Block, BlockKind, FileHeader, HeaderMagic, HxDemuxer, HxProbe};
pub use format_id::FormatId;
pub use io::IoContext;
pub use muxer::Muxer;
pub use probe::ProbeResult;
pub use registry::FormatRegistry;
pub use stream::{Stream, StreamParams};

/// 注册所有内置容器格式
pub fn register_all(registry: &mut FormatRegistry) {
    demuxers::register_all_demuxers(registry);
    muxers::register_all_muxers(registry);
}
