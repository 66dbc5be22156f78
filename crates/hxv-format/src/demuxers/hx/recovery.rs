//! 恢复扫描.
//!
//! 不信任任何长度字段, 直接在原始字节中搜索已知标签, 用于文件头损坏
//! 或结构化扫描提前结束的文件. 数据中恰好出现的标签字节会产生虚假候选,
//! 因此每个候选都要经过长度校验.

use hxv_codec::parsers::h265::nal_unit_type;
use hxv_core::{HxError, HxResult};
use log::{debug, warn};

use super::block::{
    BLOCK_HEADER_SIZE, Block, BlockKind, FILE_HEADER_SIZE, FOOTER_HEADER_SIZE, FileHeader,
    HeaderMagic, TAG_AUDIO, TAG_FOOTER, TAG_SPLIT_FILE, TAG_STREAM_FILE, TAG_VIDEO,
};
use crate::io::IoContext;

/// 默认分块大小 (4 MB)
pub const DEFAULT_CHUNK_SIZE: usize = 4 * 1024 * 1024;

/// 搜索的全部标签
pub const RECOGNIZED_TAGS: [[u8; 4]; 5] = [
    TAG_STREAM_FILE,
    TAG_SPLIT_FILE,
    TAG_VIDEO,
    TAG_AUDIO,
    TAG_FOOTER,
];

/// 块之间保留的重叠字节数, 保证跨块边界的标签恰好被找到一次
const CARRY_LEN: usize = 3;

/// 一次标签命中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TagHit {
    /// 标签在文件中的绝对偏移
    pub offset: u64,
    /// 标签内容
    pub tag: [u8; 4],
}

/// 经过长度解析的候选块
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    /// 标签命中
    pub hit: TagHit,
    /// 解析出的数据长度 (文件头候选为 None)
    pub length: Option<u32>,
    /// 解析出的原始时间戳 (仅音视频块)
    pub raw_timestamp: Option<u32>,
    /// 候选块的结束位置 (字段读取失败时为 None)
    pub end: Option<u64>,
    /// 结束位置既未越过下一个候选, 也未越过文件末尾
    pub valid: bool,
}

/// 恢复扫描的结果
#[derive(Debug, Clone)]
pub struct Recovered {
    /// 找到的第一个有效文件头
    pub header: Option<FileHeader>,
    /// 按发现顺序排列的音视频块
    pub blocks: Vec<Block>,
}

/// 流式标签搜索器
struct TagSearcher {
    carry: Vec<u8>,
    consumed: u64,
    hits: Vec<TagHit>,
}

impl TagSearcher {
    fn new() -> Self {
        Self {
            carry: Vec::with_capacity(CARRY_LEN),
            consumed: 0,
            hits: Vec::new(),
        }
    }

    fn feed(&mut self, chunk: &[u8]) {
        let mut window = std::mem::take(&mut self.carry);
        let window_start = self.consumed - window.len() as u64;
        window.extend_from_slice(chunk);

        for (pos, candidate) in window.windows(4).enumerate() {
            if let Some(tag) = RECOGNIZED_TAGS.iter().find(|t| t.as_slice() == candidate) {
                self.hits.push(TagHit {
                    offset: window_start + pos as u64,
                    tag: *tag,
                });
            }
        }

        self.consumed += chunk.len() as u64;
        let keep = window.len().min(CARRY_LEN);
        self.carry = window.split_off(window.len() - keep);
    }

    fn finish(mut self) -> Vec<TagHit> {
        self.hits.sort_by_key(|h| h.offset);
        self.hits
    }
}

/// 从头分块读取输入, 找出所有已知标签
pub fn find_tags(io: &mut IoContext, chunk_size: usize) -> HxResult<Vec<TagHit>> {
    if chunk_size == 0 {
        return Err(HxError::InvalidArgument("恢复扫描分块大小不能为 0".into()));
    }
    io.seek(std::io::SeekFrom::Start(0))?;

    let mut searcher = TagSearcher::new();
    let mut chunk = vec![0u8; chunk_size];
    loop {
        let n = io.read_up_to(&mut chunk)?;
        if n == 0 {
            break;
        }
        searcher.feed(&chunk[..n]);
        if n < chunk_size {
            break;
        }
    }

    let hits = searcher.finish();
    debug!("HX 恢复: 找到 {} 个标签", hits.len());
    Ok(hits)
}

/// 在内存数据中按分块方式搜索标签
pub fn find_tags_in(data: &[u8], chunk_size: usize) -> HxResult<Vec<TagHit>> {
    if chunk_size == 0 {
        return Err(HxError::InvalidArgument("恢复扫描分块大小不能为 0".into()));
    }
    let mut searcher = TagSearcher::new();
    for chunk in data.chunks(chunk_size) {
        searcher.feed(chunk);
    }
    Ok(searcher.finish())
}

/// 读取候选位置的字段, 返回 (length, raw_timestamp, end)
fn parse_candidate(
    io: &mut IoContext,
    hit: &TagHit,
) -> HxResult<(Option<u32>, Option<u32>, u64)> {
    io.seek(std::io::SeekFrom::Start(hit.offset + 4))?;
    if HeaderMagic::from_tag(&hit.tag).is_some() {
        // width + height
        let mut dims = [0u8; 8];
        io.read_exact(&mut dims)?;
        return Ok((None, None, hit.offset + FILE_HEADER_SIZE));
    }

    let length = io.read_u32_le()?;
    match BlockKind::from_tag(hit.tag) {
        BlockKind::IndexFooter => Ok((
            Some(length),
            None,
            hit.offset + FOOTER_HEADER_SIZE + u64::from(length),
        )),
        _ => {
            let raw_timestamp = io.read_u32_le()?;
            Ok((
                Some(length),
                Some(raw_timestamp),
                hit.offset + BLOCK_HEADER_SIZE + u64::from(length),
            ))
        }
    }
}

/// 解析每个候选的长度字段并校验
///
/// 候选的结束位置不得越过下一个候选的偏移, 也不得越过文件末尾.
pub fn validate_candidates(io: &mut IoContext, hits: &[TagHit]) -> HxResult<Vec<Candidate>> {
    let size = io.size();
    let mut candidates = Vec::with_capacity(hits.len());

    for (i, hit) in hits.iter().enumerate() {
        let limit = hits.get(i + 1).map(|h| h.offset).or(size);
        let (length, raw_timestamp, end) = match parse_candidate(io, hit) {
            Ok((length, ts, end)) => (length, ts, Some(end)),
            Err(HxError::Eof) => (None, None, None),
            Err(e) => return Err(e),
        };
        let valid = match (end, limit) {
            (Some(end), Some(limit)) => end <= limit,
            (Some(_), None) => true,
            (None, _) => false,
        };
        candidates.push(Candidate {
            hit: *hit,
            length,
            raw_timestamp,
            end,
            valid,
        });
    }

    let valid = candidates.iter().filter(|c| c.valid).count();
    debug!("HX 恢复: {} 个候选, {} 个有效", candidates.len(), valid);
    Ok(candidates)
}

/// 用恢复扫描重建块列表
///
/// 按偏移顺序接受候选: 有效的候选, 或结束位置恰好落在另一个标签 (或文件末尾) 上的候选.
/// 落在已接受块内部的命中视为数据中的巧合字节并跳过.
pub fn recover_blocks(io: &mut IoContext, chunk_size: usize) -> HxResult<Recovered> {
    let hits = find_tags(io, chunk_size)?;
    let candidates = validate_candidates(io, &hits)?;
    let size = io.size();

    let lands_on_boundary = |end: u64| {
        size == Some(end) || hits.binary_search_by_key(&end, |h| h.offset).is_ok()
    };

    let mut header = None;
    let mut blocks = Vec::new();
    let mut cursor = 0u64;
    let mut skipped = 0usize;

    for c in &candidates {
        if c.hit.offset < cursor {
            skipped += 1;
            continue;
        }
        let Some(end) = c.end else {
            continue;
        };
        if !(c.valid || lands_on_boundary(end)) {
            skipped += 1;
            continue;
        }

        if let Some(magic) = HeaderMagic::from_tag(&c.hit.tag) {
            if header.is_none() {
                io.seek(std::io::SeekFrom::Start(c.hit.offset + 4))?;
                let width = io.read_u32_le()?;
                let height = io.read_u32_le()?;
                header = Some(FileHeader {
                    magic,
                    width,
                    height,
                });
            }
            cursor = end;
            continue;
        }

        let kind = BlockKind::from_tag(c.hit.tag);
        if let (Some(length), Some(raw_timestamp)) = (c.length, c.raw_timestamp) {
            let mut block = Block::new(kind, c.hit.offset, length, raw_timestamp);
            if kind == BlockKind::VideoFrame {
                let (payload_offset, payload_len) = block.payload_range();
                io.seek(std::io::SeekFrom::Start(payload_offset))?;
                let mut prefix = [0u8; 5];
                let want = payload_len.min(prefix.len());
                let n = io.read_up_to(&mut prefix[..want])?;
                block.nalu_type = nal_unit_type(&prefix[..n]);
            }
            blocks.push(block);
        }
        cursor = end;
    }

    if skipped > 0 {
        warn!("HX 恢复: 跳过 {} 个可疑候选", skipped);
    }
    debug!("HX 恢复: 重建 {} 个块", blocks.len());
    Ok(Recovered { header, blocks })
}
