//! 文件检查: 魔数判断, 基本信息, 块索引.

use std::path::Path;

use hxv_core::{HxError, HxResult};
use hxv_format::{Block, Demuxer, HeaderMagic, HxDemuxer, IoContext};
use serde::Serialize;

/// HX 文件基本信息
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FileInfo {
    /// 文件头魔数 ("HXVT", "HXVS", 无法识别时为 "Unknown")
    #[serde(rename = "type")]
    pub kind: String,
    /// 画面宽度
    pub width: u32,
    /// 画面高度
    pub height: u32,
    /// 文件大小 (字节)
    pub size: u64,
    /// 首尾块的时间跨度 (秒)
    pub duration: Option<f64>,
}

/// 文件是否以 HX 文件头魔数开头
pub fn is_hx_file(path: impl AsRef<Path>) -> HxResult<bool> {
    let mut io = IoContext::open_read(path)?;
    let mut magic = [0u8; 4];
    let n = io.read_up_to(&mut magic)?;
    Ok(n == magic.len() && HeaderMagic::from_tag(&magic).is_some())
}

/// 读取文件基本信息
///
/// 魔数无法识别时只返回大小, 宽高为 0, 时长为 None.
pub fn file_info(path: impl AsRef<Path>) -> HxResult<FileInfo> {
    let mut io = IoContext::open_read(path)?;
    let size = io.size().unwrap_or(0);

    let mut demuxer = HxDemuxer::new();
    match demuxer.open(&mut io) {
        Ok(()) => {}
        Err(HxError::BadMagic(_)) => {
            return Ok(FileInfo {
                kind: "Unknown".to_string(),
                width: 0,
                height: 0,
                size,
                duration: None,
            });
        }
        Err(e) => return Err(e),
    }

    let (kind, width, height) = demuxer.header().map_or(("Unknown", 0, 0), |h| {
        (h.magic.name(), h.width, h.height)
    });
    Ok(FileInfo {
        kind: kind.to_string(),
        width,
        height,
        size,
        duration: demuxer.duration(),
    })
}

/// 扫描并对齐文件中的全部块
pub fn index_file(path: impl AsRef<Path>, recovery_chunk_size: Option<usize>) -> HxResult<Vec<Block>> {
    let mut io = IoContext::open_read(path)?;
    let mut demuxer = HxDemuxer::new();
    if let Some(chunk_size) = recovery_chunk_size {
        demuxer = demuxer.with_recovery(chunk_size);
    }
    demuxer.open(&mut io)?;
    Ok(demuxer.blocks().to_vec())
}
