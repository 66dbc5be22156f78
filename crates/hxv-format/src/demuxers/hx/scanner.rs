//! HX 结构化扫描.
//!
//! 从文件头开始逐块读取, 依靠每个块声明的长度跳到下一个块.
//! 文件在块中途结束或遇到无法识别的标签都视为正常的流结束,
//! 已收集的块全部有效.

use hxv_codec::parsers::h265::nal_unit_type;
use hxv_core::{HxError, HxResult};
use log::{debug, warn};

use super::block::{Block, BlockKind, FILE_HEADER_SIZE, FOOTER_HEADER_SIZE, FileHeader, HeaderMagic};
use crate::io::IoContext;

/// 识别 NAL 类型需要的负载前缀长度 (4 字节起始码 + 1 字节 NAL 头)
const NAL_PREFIX_LEN: usize = 5;

/// 扫描结束原因
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    /// 恰好在块边界处到达文件末尾
    EndOfFile,
    /// 遇到无法识别的标签
    UnknownTag([u8; 4]),
    /// 文件在块中途结束
    Truncated,
}

/// 扫描结果
#[derive(Debug, Clone)]
pub struct ScanResult {
    /// 文件头
    pub header: FileHeader,
    /// 按发现顺序排列的音视频块 (不含 HXFI)
    pub blocks: Vec<Block>,
    /// 扫描停止的位置
    pub end_offset: u64,
    /// 扫描停止的原因
    pub stop_reason: StopReason,
}

/// 读取并校验文件头
///
/// 前 4 字节必须是 `HXVT` 或 `HXVS`, 不足 4 字节同样视为魔数错误.
pub fn read_file_header(io: &mut IoContext) -> HxResult<FileHeader> {
    io.seek(std::io::SeekFrom::Start(0))?;
    let mut head = [0u8; 12];
    let n = io.read_up_to(&mut head)?;

    let mut tag = [0u8; 4];
    tag[..n.min(4)].copy_from_slice(&head[..n.min(4)]);
    let magic = match HeaderMagic::from_tag(&head[..n.min(4)]) {
        Some(magic) => magic,
        None => return Err(HxError::BadMagic(tag)),
    };
    if n < head.len() {
        return Err(HxError::InvalidData(format!(
            "HX: 文件头不完整, 仅有 {} 字节",
            n
        )));
    }

    let width = u32::from_le_bytes([head[4], head[5], head[6], head[7]]);
    let height = u32::from_le_bytes([head[8], head[9], head[10], head[11]]);
    Ok(FileHeader {
        magic,
        width,
        height,
    })
}

/// 扫描整个文件, 返回文件头和全部音视频块
pub fn scan(io: &mut IoContext) -> HxResult<ScanResult> {
    let header = read_file_header(io)?;
    debug!(
        "HX: 文件头 {}, {}x{}",
        header.magic, header.width, header.height
    );

    let size = io.size();
    let mut offset = FILE_HEADER_SIZE;
    io.seek(std::io::SeekFrom::Start(offset))?;

    let mut blocks = Vec::new();
    let mut footers = 0usize;

    let stop_reason = loop {
        let mut tag = [0u8; 4];
        match io.read_up_to(&mut tag)? {
            0 => break StopReason::EndOfFile,
            4 => {}
            _ => break StopReason::Truncated,
        }

        match BlockKind::from_tag(tag) {
            kind @ (BlockKind::VideoFrame | BlockKind::AudioFrame) => {
                let mut fields = [0u8; 12];
                if io.read_up_to(&mut fields)? < fields.len() {
                    break StopReason::Truncated;
                }
                let length = u32::from_le_bytes([fields[0], fields[1], fields[2], fields[3]]);
                let raw_timestamp =
                    u32::from_le_bytes([fields[4], fields[5], fields[6], fields[7]]);
                // fields[8..12]: 含义未知的子头, 原样跳过

                let mut block = Block::new(kind, offset, length, raw_timestamp);
                if size.is_some_and(|size| block.end_offset() > size) {
                    break StopReason::Truncated;
                }

                let mut consumed = 0usize;
                if kind == BlockKind::VideoFrame {
                    let mut prefix = [0u8; NAL_PREFIX_LEN];
                    let want = NAL_PREFIX_LEN.min(length as usize);
                    consumed = io.read_up_to(&mut prefix[..want])?;
                    block.nalu_type = nal_unit_type(&prefix[..consumed]);
                }
                match io.skip(length as usize - consumed) {
                    Ok(()) => {}
                    Err(HxError::Eof) => break StopReason::Truncated,
                    Err(e) => return Err(e),
                }

                offset = block.end_offset();
                blocks.push(block);
            }
            BlockKind::IndexFooter => {
                let mut len_buf = [0u8; 4];
                if io.read_up_to(&mut len_buf)? < len_buf.len() {
                    break StopReason::Truncated;
                }
                let length = u64::from(u32::from_le_bytes(len_buf));
                let end = offset + FOOTER_HEADER_SIZE + length;
                if size.is_some_and(|size| end > size) {
                    break StopReason::Truncated;
                }
                match io.skip(length as usize) {
                    Ok(()) => {}
                    Err(HxError::Eof) => break StopReason::Truncated,
                    Err(e) => return Err(e),
                }
                footers += 1;
                offset = end;
            }
            BlockKind::Unknown(tag) => break StopReason::UnknownTag(tag),
        }
    };

    match stop_reason {
        StopReason::EndOfFile => {}
        StopReason::Truncated => warn!("HX: 文件在偏移 {} 处截断, 停止扫描", offset),
        StopReason::UnknownTag(tag) => debug!(
            "HX: 偏移 {} 处遇到未知标签 {}, 停止扫描",
            offset,
            BlockKind::Unknown(tag)
        ),
    }
    debug!(
        "HX: 扫描完成, {} 个块, {} 个尾部块, 结束于偏移 {}",
        blocks.len(),
        footers,
        offset
    );

    Ok(ScanResult {
        header,
        blocks,
        end_offset: offset,
        stop_reason,
    })
}
