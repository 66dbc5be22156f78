//! HX 文件头与块描述.
//!
//! 文件布局 (全部小端):
//! ```text
//! 0   magic       "HXVT" (流文件) 或 "HXVS" (分段文件)
//! 4   width       u32
//! 8   height      u32
//! 16  第一个块
//!
//! HXVF/HXAF: tag(4) length(4) timestamp(4) sub_header(4) data(length)
//! HXFI:      tag(4) length(4) data(length)
//! ```
//!
//! 音频块的 data 以 4 字节音频头开头, 其后 `length - 4` 字节为 A-law 采样.

use std::fmt;

/// 流文件魔数
pub const TAG_STREAM_FILE: [u8; 4] = *b"HXVT";
/// 分段文件魔数
pub const TAG_SPLIT_FILE: [u8; 4] = *b"HXVS";
/// 视频块标签
pub const TAG_VIDEO: [u8; 4] = *b"HXVF";
/// 音频块标签
pub const TAG_AUDIO: [u8; 4] = *b"HXAF";
/// 索引/尾部块标签
pub const TAG_FOOTER: [u8; 4] = *b"HXFI";

/// 文件头大小, 第一个块从此偏移开始
pub const FILE_HEADER_SIZE: u64 = 16;
/// 音视频块头大小 (tag + length + timestamp + sub_header)
pub const BLOCK_HEADER_SIZE: u64 = 16;
/// 尾部块头大小 (tag + length)
pub const FOOTER_HEADER_SIZE: u64 = 8;
/// 音频数据开头的不透明音频头大小
pub const AUDIO_HEADER_SIZE: u64 = 4;

/// 文件头魔数
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeaderMagic {
    /// HXVT
    StreamFile,
    /// HXVS
    SplitFile,
}

impl HeaderMagic {
    /// 从 4 字节标签识别
    pub fn from_tag(tag: &[u8]) -> Option<Self> {
        match tag {
            t if t == TAG_STREAM_FILE => Some(Self::StreamFile),
            t if t == TAG_SPLIT_FILE => Some(Self::SplitFile),
            _ => None,
        }
    }

    /// 对应的 4 字节标签
    pub const fn tag(&self) -> [u8; 4] {
        match self {
            Self::StreamFile => TAG_STREAM_FILE,
            Self::SplitFile => TAG_SPLIT_FILE,
        }
    }

    /// 标签文本
    pub const fn name(&self) -> &'static str {
        match self {
            Self::StreamFile => "HXVT",
            Self::SplitFile => "HXVS",
        }
    }
}

impl fmt::Display for HeaderMagic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// HX 文件头
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileHeader {
    /// 文件类型魔数
    pub magic: HeaderMagic,
    /// 画面宽度
    pub width: u32,
    /// 画面高度
    pub height: u32,
}

/// 块类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    /// HXVF: 一个 H.265 NAL 单元
    VideoFrame,
    /// HXAF: 一帧 A-law 音频
    AudioFrame,
    /// HXFI: 内容未知的索引/尾部块
    IndexFooter,
    /// 无法识别的标签
    Unknown([u8; 4]),
}

impl BlockKind {
    /// 从 4 字节标签识别
    pub fn from_tag(tag: [u8; 4]) -> Self {
        match tag {
            TAG_VIDEO => Self::VideoFrame,
            TAG_AUDIO => Self::AudioFrame,
            TAG_FOOTER => Self::IndexFooter,
            other => Self::Unknown(other),
        }
    }

    /// 对应的 4 字节标签
    pub const fn tag(&self) -> [u8; 4] {
        match self {
            Self::VideoFrame => TAG_VIDEO,
            Self::AudioFrame => TAG_AUDIO,
            Self::IndexFooter => TAG_FOOTER,
            Self::Unknown(tag) => *tag,
        }
    }
}

impl fmt::Display for BlockKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tag = self.tag();
        if tag.iter().all(|b| b.is_ascii_graphic()) {
            f.write_str(&String::from_utf8_lossy(&tag))
        } else {
            write!(f, "{:02X}{:02X}{:02X}{:02X}", tag[0], tag[1], tag[2], tag[3])
        }
    }
}

/// 块描述
///
/// 由扫描器按发现顺序创建; 时间对齐阶段填写 `relative_timestamp` 与 `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Block {
    /// 块类型
    pub kind: BlockKind,
    /// 块标签在文件中的偏移
    pub offset: u64,
    /// 声明的数据长度
    pub length: u32,
    /// 原始时间戳 (毫秒)
    pub raw_timestamp: u32,
    /// 相对第一个块的时间戳 (毫秒)
    pub relative_timestamp: Option<i64>,
    /// 到下一个同类块的时间差 (毫秒)
    pub duration: Option<i64>,
    /// 视频块负载开头的 NAL 单元类型
    pub nalu_type: Option<u8>,
}

impl Block {
    /// 创建块描述, 计算字段均未设置
    pub fn new(kind: BlockKind, offset: u64, length: u32, raw_timestamp: u32) -> Self {
        Self {
            kind,
            offset,
            length,
            raw_timestamp,
            relative_timestamp: None,
            duration: None,
            nalu_type: None,
        }
    }

    /// 是否为视频块
    pub fn is_video(&self) -> bool {
        self.kind == BlockKind::VideoFrame
    }

    /// 是否为音频块
    pub fn is_audio(&self) -> bool {
        self.kind == BlockKind::AudioFrame
    }

    /// 块头大小
    pub fn header_size(&self) -> u64 {
        match self.kind {
            BlockKind::IndexFooter => FOOTER_HEADER_SIZE,
            _ => BLOCK_HEADER_SIZE,
        }
    }

    /// 块结束位置 (下一个块的起始偏移)
    pub fn end_offset(&self) -> u64 {
        self.offset + self.header_size() + u64::from(self.length)
    }

    /// 可解码负载的位置与长度
    ///
    /// 视频为完整数据; 音频跳过 4 字节音频头, 只保留 A-law 采样.
    pub fn payload_range(&self) -> (u64, usize) {
        let data_start = self.offset + self.header_size();
        match self.kind {
            BlockKind::AudioFrame => (
                data_start + AUDIO_HEADER_SIZE,
                (u64::from(self.length).saturating_sub(AUDIO_HEADER_SIZE)) as usize,
            ),
            _ => (data_start, self.length as usize),
        }
    }
}
