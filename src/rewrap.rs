//! 重封装流程.
//!
//! 格式校验 → 输出存在性检查 → 扫描与对齐 → 声明流 → 按时间戳顺序写入 → 关闭.

use std::path::{Path, PathBuf};

use hxv_core::{HxError, HxResult, MediaType};
use hxv_format::{Demuxer, FormatId, FormatRegistry, HxDemuxer, IoContext};
use log::{debug, info};
use serde::Serialize;

use crate::config::RewrapOptions;
use crate::default_format_registry;
use crate::output::OutputContainer;

/// 进度通知
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// 已处理的块数
    pub blocks_done: usize,
    /// 总块数
    pub blocks_total: usize,
}

/// 重封装结果
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RewrapSummary {
    /// 输出文件路径
    pub output: PathBuf,
    /// 写入的视频访问单元数
    pub video_packets: u64,
    /// 写入的音频帧数
    pub audio_packets: u64,
    /// 末尾被丢弃的不完整访问单元字节数
    pub dropped_bytes: usize,
    /// 对齐后的块数
    pub blocks: usize,
    /// 首尾块的时间跨度 (毫秒)
    pub duration_ms: Option<i64>,
    /// 块列表是否来自恢复扫描
    pub recovered: bool,
}

/// 解析输出格式, 没有对应封装器时返回 `HxError::UnsupportedFormat`
pub fn resolve_output_format(registry: &FormatRegistry, name: &str) -> HxResult<FormatId> {
    let format = FormatId::from_name(name)
        .filter(|id| *id != FormatId::Hx)
        .ok_or_else(|| HxError::UnsupportedFormat(format!("未知的输出格式 {name}")))?;
    if !registry.has_muxer(format) {
        return Err(HxError::UnsupportedFormat(format!(
            "{format} 格式暂无封装器"
        )));
    }
    Ok(format)
}

/// 默认输出路径: 输入文件名替换扩展名
pub fn default_output_path(input: &Path, format_name: &str) -> PathBuf {
    match FormatId::from_name(format_name) {
        Some(id) => input.with_extension(id.default_extension()),
        None => input.with_extension(format_name.to_ascii_lowercase()),
    }
}

/// 将一个 HX 文件重封装为标准容器
///
/// `output` 为 None 时输出到输入文件旁边, 扩展名取 `options.format`.
/// 文件中没有任何块时返回 `HxError::NoBlocks`, 此时不会创建输出文件.
/// 写入过程中出错时删除不完整的输出文件.
pub fn rewrap_file(
    input: &Path,
    output: Option<&Path>,
    options: &RewrapOptions,
    mut progress: impl FnMut(Progress),
) -> HxResult<RewrapSummary> {
    let registry = default_format_registry();
    let format = resolve_output_format(&registry, &options.format)?;

    let output = output
        .map(Path::to_path_buf)
        .unwrap_or_else(|| default_output_path(input, &options.format));
    if !options.overwrite && output.exists() {
        return Err(HxError::OutputExists(output.display().to_string()));
    }

    let mut io = IoContext::open_read(input)?;
    let mut demuxer = HxDemuxer::new();
    if options.recover {
        demuxer = demuxer.with_recovery(options.recovery_chunk_size);
    }
    demuxer.open(&mut io)?;

    let blocks_total = demuxer.blocks().len();
    if blocks_total == 0 {
        return Err(HxError::NoBlocks(input.display().to_string()));
    }

    let mut container = OutputContainer::open(&registry, &output, format)?;
    let (video_packets, audio_packets) =
        match transfer(&mut demuxer, &mut io, &mut container, blocks_total, &mut progress) {
            Ok(counts) => counts,
            Err(e) => {
                container.abort();
                return Err(e);
            }
        };
    container.close()?;

    let summary = RewrapSummary {
        output,
        video_packets,
        audio_packets,
        dropped_bytes: demuxer.dropped_bytes(),
        blocks: blocks_total,
        duration_ms: demuxer.duration().map(|s| (s * 1000.0).round() as i64),
        recovered: demuxer.is_recovered(),
    };
    info!(
        "{} → {}: {} 视频包, {} 音频包",
        input.display(),
        summary.output.display(),
        summary.video_packets,
        summary.audio_packets
    );
    if summary.dropped_bytes > 0 {
        debug!("末尾丢弃 {} 字节", summary.dropped_bytes);
    }
    Ok(summary)
}

/// 按时间戳顺序把全部数据包写入输出容器, 返回 (视频包数, 音频包数)
fn transfer(
    demuxer: &mut HxDemuxer,
    io: &mut IoContext,
    container: &mut OutputContainer,
    blocks_total: usize,
    progress: &mut impl FnMut(Progress),
) -> HxResult<(u64, u64)> {
    // 输入流索引 → 输出流索引
    let mut stream_map = Vec::new();
    for stream in demuxer.streams() {
        stream_map.push(container.declare_stream(stream.clone())?);
    }

    let mut video_packets = 0u64;
    let mut audio_packets = 0u64;
    loop {
        let mut pkt = match demuxer.read_packet(io) {
            Ok(pkt) => pkt,
            Err(HxError::Eof) => break,
            Err(e) => return Err(e),
        };
        let media_type = demuxer
            .streams()
            .get(pkt.stream_index)
            .map(|s| s.media_type)
            .ok_or(HxError::StreamNotFound(pkt.stream_index))?;
        pkt.stream_index = stream_map[pkt.stream_index];
        container.write(&pkt)?;
        match media_type {
            MediaType::Video => video_packets += 1,
            MediaType::Audio => audio_packets += 1,
        }
        progress(Progress {
            blocks_done: demuxer.blocks_read(),
            blocks_total,
        });
    }
    Ok((video_packets, audio_packets))
}
