//! HX 网络摄像机录像解封装器.
//!
//! HX 是部分国产网络摄像机 (HX 系列固件) 写入 SD 卡的私有录像格式,
//! 文件扩展名为 `.265` (H.265) 或 `.264` (H.264, 暂不支持).
//! 文件没有可信的全局索引, 块边界、时间戳和帧分组都只能顺序解析得到.
//!
//! 解封装分三步:
//! 1. [`scanner`]: 逐块扫描, 得到块列表
//! 2. [`reconcile`]: 按时间戳排序, 计算相对时间戳与时长
//! 3. `read_packet()`: 视频块经 [`AccessUnitAssembler`] 组装为访问单元,
//!    音频块解码为 PCM S16LE
//!
//! 输出两条流: 流 0 为 H.265 视频, 流 1 为 8000 Hz 单声道 PCM 音频, 时间基均为 1/1000.

pub mod block;
pub mod recovery;
pub mod reconcile;
pub mod scanner;

use hxv_codec::parsers::h265::{HevcNalUnitType, ParameterSets};
use hxv_codec::{AccessUnitAssembler, AudioFrame, CodecId, Packet};
use hxv_core::{HxError, HxResult, Rational, SampleFormat};
use log::{debug, warn};

use crate::demuxer::Demuxer;
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::probe::{FormatProbe, ProbeScore, SCORE_EXTENSION, SCORE_MAX};
use crate::stream::Stream;

pub use block::{Block, BlockKind, FileHeader, HeaderMagic};
pub use scanner::{ScanResult, StopReason};

/// 视频流索引
pub const VIDEO_STREAM_INDEX: usize = 0;
/// 音频流索引
pub const AUDIO_STREAM_INDEX: usize = 1;
/// 音频采样率
pub const AUDIO_SAMPLE_RATE: u32 = 8000;
/// 音频声道数
pub const AUDIO_CHANNELS: u32 = 1;

/// 查找参数集时最多读取的视频块数
const PARAMETER_SET_SEARCH_LIMIT: usize = 64;

/// HX 解封装器
pub struct HxDemuxer {
    /// 流信息
    streams: Vec<Stream>,
    /// 文件头 (恢复扫描未找到文件头时为 None)
    header: Option<FileHeader>,
    /// 对齐后的块列表
    blocks: Vec<Block>,
    /// 下一个待处理的块
    cursor: usize,
    /// 视频访问单元组装器
    assembler: AccessUnitAssembler,
    /// 恢复扫描分块大小, None 表示不启用恢复扫描
    recovery_chunk_size: Option<usize>,
    /// 结构化扫描的结束原因
    stop_reason: Option<StopReason>,
    /// 是否使用了恢复扫描的结果
    recovered: bool,
    /// 末尾被丢弃的不完整访问单元字节数
    dropped_bytes: usize,
    /// 是否已到达末尾
    finished: bool,
}

impl HxDemuxer {
    /// 创建 HX 解封装器实例 (工厂函数)
    pub fn create() -> HxResult<Box<dyn Demuxer>> {
        Ok(Box::new(Self::new()))
    }

    /// 创建解封装器
    pub fn new() -> Self {
        Self {
            streams: Vec::new(),
            header: None,
            blocks: Vec::new(),
            cursor: 0,
            assembler: AccessUnitAssembler::new(),
            recovery_chunk_size: None,
            stop_reason: None,
            recovered: false,
            dropped_bytes: 0,
            finished: false,
        }
    }

    /// 启用恢复扫描
    ///
    /// 文件头魔数错误, 或结构化扫描在文件末尾之前停止时, 改用标签搜索重建块列表.
    pub fn with_recovery(mut self, chunk_size: usize) -> Self {
        self.recovery_chunk_size = Some(chunk_size);
        self
    }

    /// 文件头
    pub fn header(&self) -> Option<&FileHeader> {
        self.header.as_ref()
    }

    /// 对齐后的块列表
    pub fn blocks(&self) -> &[Block] {
        &self.blocks
    }

    /// 结构化扫描的结束原因 (魔数错误后走恢复扫描时为 None)
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.stop_reason
    }

    /// 块列表是否来自恢复扫描
    pub fn is_recovered(&self) -> bool {
        self.recovered
    }

    /// 末尾被丢弃的不完整访问单元字节数
    pub fn dropped_bytes(&self) -> usize {
        self.dropped_bytes
    }

    /// 已处理的块数
    pub fn blocks_read(&self) -> usize {
        self.cursor
    }

    /// 得到块列表: 结构化扫描, 必要时改用恢复扫描
    fn discover_blocks(&mut self, io: &mut IoContext) -> HxResult<()> {
        let scan = match scanner::scan(io) {
            Ok(scan) => scan,
            Err(HxError::BadMagic(tag)) => {
                let Some(chunk_size) = self.recovery_chunk_size else {
                    return Err(HxError::BadMagic(tag));
                };
                warn!("HX: 文件头魔数错误, 改用恢复扫描");
                let recovered = recovery::recover_blocks(io, chunk_size)?;
                self.header = recovered.header;
                self.blocks = recovered.blocks;
                self.recovered = true;
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        self.header = Some(scan.header);
        self.stop_reason = Some(scan.stop_reason);

        if let Some(chunk_size) = self.recovery_chunk_size {
            if scan.stop_reason != StopReason::EndOfFile {
                let recovered = recovery::recover_blocks(io, chunk_size)?;
                if recovered.blocks.len() > scan.blocks.len() {
                    warn!(
                        "HX: 结构化扫描在偏移 {} 处停止, 恢复扫描多找到 {} 个块",
                        scan.end_offset,
                        recovered.blocks.len() - scan.blocks.len()
                    );
                    self.blocks = recovered.blocks;
                    self.recovered = true;
                    return Ok(());
                }
            }
        }

        self.blocks = scan.blocks;
        Ok(())
    }

    /// 从开头的视频块中收集 VPS/SPS/PPS, 构建 hvcC
    fn probe_parameter_sets(&self, io: &mut IoContext) -> HxResult<Option<Vec<u8>>> {
        let mut sets = ParameterSets::default();
        for block in self
            .blocks
            .iter()
            .filter(|b| b.is_video())
            .take(PARAMETER_SET_SEARCH_LIMIT)
        {
            let payload = read_payload(io, block)?;
            sets.absorb(&payload);
            if sets.is_complete() {
                return sets.to_hvcc().map(Some);
            }
        }
        Ok(None)
    }
}

impl Default for HxDemuxer {
    fn default() -> Self {
        Self::new()
    }
}

/// 读取块的可解码负载
///
/// 扫描阶段已确认块完整, 此时读不满说明输入在打开之后被改动, 作为数据错误返回,
/// 不能当作流结束.
fn read_payload(io: &mut IoContext, block: &Block) -> HxResult<Vec<u8>> {
    let (offset, len) = block.payload_range();
    io.seek(std::io::SeekFrom::Start(offset))?;
    io.read_bytes(len).map_err(|e| match e {
        HxError::Eof => HxError::InvalidData(format!(
            "HX: 偏移 {} 处的 {} 块数据不完整",
            block.offset, block.kind
        )),
        other => other,
    })
}

impl Demuxer for HxDemuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Hx
    }

    fn name(&self) -> &str {
        "hx"
    }

    fn open(&mut self, io: &mut IoContext) -> HxResult<()> {
        self.discover_blocks(io)?;
        reconcile::reconcile(&mut self.blocks);

        let (width, height) = self.header.map_or((0, 0), |h| (h.width, h.height));
        let span = reconcile::span_ms(&self.blocks);

        let mut video = Stream::video(
            VIDEO_STREAM_INDEX,
            CodecId::H265,
            width,
            height,
            Rational::MILLI,
        );
        video.nb_frames = self
            .blocks
            .iter()
            .filter(|b| b.is_video())
            .filter(|b| {
                b.nalu_type
                    .is_some_and(|t| HevcNalUnitType::from_type_id(t).terminates_access_unit())
            })
            .count() as u64;
        video.duration = span;
        match self.probe_parameter_sets(io)? {
            Some(hvcc) => video.extra_data = hvcc,
            None => debug!("HX: 未找到完整的 VPS/SPS/PPS, 视频流不带 hvcC"),
        }

        let mut audio = Stream::audio(
            AUDIO_STREAM_INDEX,
            CodecId::PcmS16le,
            AUDIO_SAMPLE_RATE,
            AUDIO_CHANNELS,
            SampleFormat::S16,
            Rational::MILLI,
        );
        audio.nb_frames = self.blocks.iter().filter(|b| b.is_audio()).count() as u64;
        audio.duration = span;

        debug!(
            "HX 打开完成: {}x{}, {} 个块 ({} 视频访问单元, {} 音频帧)",
            width,
            height,
            self.blocks.len(),
            video.nb_frames,
            audio.nb_frames
        );

        self.streams = vec![video, audio];
        self.cursor = 0;
        self.assembler = AccessUnitAssembler::new();
        self.dropped_bytes = 0;
        self.finished = false;
        Ok(())
    }

    fn streams(&self) -> &[Stream] {
        &self.streams
    }

    fn read_packet(&mut self, io: &mut IoContext) -> HxResult<Packet> {
        loop {
            let Some(block) = self.blocks.get(self.cursor).copied() else {
                if !self.finished {
                    self.finished = true;
                    self.dropped_bytes = self.assembler.finish();
                    if self.dropped_bytes > 0 {
                        warn!(
                            "HX: 末尾 {} 字节不构成完整访问单元, 已丢弃",
                            self.dropped_bytes
                        );
                    }
                }
                return Err(HxError::Eof);
            };
            self.cursor += 1;

            let pts = block.relative_timestamp.unwrap_or(0);
            match block.kind {
                BlockKind::VideoFrame => {
                    let payload = read_payload(io, &block)?;
                    if let Some(au) = self.assembler.push(&payload, pts, block.duration) {
                        let mut pkt = au.into_packet(VIDEO_STREAM_INDEX, Rational::MILLI);
                        pkt.pos = block.offset as i64;
                        return Ok(pkt);
                    }
                }
                BlockKind::AudioFrame => {
                    let alaw = read_payload(io, &block)?;
                    let frame = AudioFrame::from_alaw(&alaw, pts, block.duration);
                    let mut pkt = frame.into_packet(AUDIO_STREAM_INDEX, Rational::MILLI);
                    pkt.pos = block.offset as i64;
                    return Ok(pkt);
                }
                BlockKind::IndexFooter | BlockKind::Unknown(_) => {}
            }
        }
    }

    fn duration(&self) -> Option<f64> {
        reconcile::span_ms(&self.blocks).map(|ms| ms as f64 / 1000.0)
    }
}

/// HX 格式探测器
pub struct HxProbe;

impl FormatProbe for HxProbe {
    fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeScore> {
        if data.len() >= 4 && HeaderMagic::from_tag(&data[..4]).is_some() {
            return Some(SCORE_MAX);
        }

        filename
            .and_then(FormatId::from_filename)
            .filter(|id| *id == FormatId::Hx)
            .map(|_| SCORE_EXTENSION)
    }

    fn format_id(&self) -> FormatId {
        FormatId::Hx
    }
}
