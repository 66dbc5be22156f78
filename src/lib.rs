//! # hxv
//!
//! HX 网络摄像机录像文件 (`.265`) 的解析与重封装库.
//!
//! HX 录像是摄像机写入 SD 卡的私有格式, 普通播放器无法打开. 本库把其中的
//! H.265 视频按访问单元重新分组, 把 A-law 音频解码为 PCM S16LE,
//! 再写入标准容器 (目前为 Matroska). 视频数据不做重编码.
//!
//! # 快速开始
//!
//! ```rust,no_run
//! use std::path::Path;
//! use hxv::{RewrapOptions, rewrap_file};
//!
//! let options = RewrapOptions::default();
//! let summary = rewrap_file(Path::new("P1.265"), None, &options, |_| {})?;
//! println!("写入 {} 个视频包", summary.video_packets);
//! # Ok::<(), hxv::core::HxError>(())
//! ```
//!
//! # Crate 结构
//!
//! | Crate | 功能 |
//! |-------|------|
//! | `hxv-core` | 核心类型与错误 |
//! | `hxv-codec` | A-law 解码, H.265 访问单元组装 |
//! | `hxv-format` | HX 解封装, 恢复扫描, Matroska 封装 |

/// 核心类型与错误
pub use hxv_core as core;

/// 编解码层
pub use hxv_codec as codec;

/// 容器格式层
pub use hxv_format as format;

pub mod config;
pub mod inspect;
pub mod output;
pub mod rewrap;

pub use config::RewrapOptions;
pub use inspect::{FileInfo, file_info, index_file, is_hx_file};
pub use output::OutputContainer;
pub use rewrap::{Progress, RewrapSummary, rewrap_file};

use hxv_format::FormatRegistry;

/// 创建注册了全部内置格式的注册表
pub fn default_format_registry() -> FormatRegistry {
    let mut registry = FormatRegistry::new();
    hxv_format::register_all(&mut registry);
    registry
}
