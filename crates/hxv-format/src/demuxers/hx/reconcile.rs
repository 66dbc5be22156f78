//! 时间对齐.
//!
//! 录像机写入的块并不严格按时间戳递增, 音频块通常落后于同时刻的视频块.
//! 这里按原始时间戳稳定排序, 以第一个块为零点计算相对时间戳,
//! 并用同类的下一个块计算每个块的时长.

use super::block::{Block, BlockKind};

/// 对块列表做时间对齐 (原地修改)
///
/// - 按 `raw_timestamp` 稳定排序, 时间戳相同的块保持扫描顺序
/// - `relative_timestamp = raw_timestamp - 第一个块的 raw_timestamp`
/// - 视频、音频各自维护 "上一个同类块", 新块到达时回填上一个块的 `duration`
/// - 每类最后一个块的 `duration` 为 None
pub fn reconcile(blocks: &mut [Block]) {
    blocks.sort_by_key(|b| b.raw_timestamp);

    let Some(first) = blocks.first() else {
        return;
    };
    let base = i64::from(first.raw_timestamp);

    let mut last_video: Option<usize> = None;
    let mut last_audio: Option<usize> = None;

    for i in 0..blocks.len() {
        let raw = i64::from(blocks[i].raw_timestamp);
        blocks[i].relative_timestamp = Some(raw - base);
        blocks[i].duration = None;

        let slot = match blocks[i].kind {
            BlockKind::VideoFrame => &mut last_video,
            BlockKind::AudioFrame => &mut last_audio,
            _ => continue,
        };
        if let Some(prev) = slot.replace(i) {
            blocks[prev].duration = Some(raw - i64::from(blocks[prev].raw_timestamp));
        }
    }
}

/// 对齐后的总时长 (毫秒): 最后一个块与第一个块的时间差
pub fn span_ms(blocks: &[Block]) -> Option<i64> {
    blocks.last().and_then(|b| b.relative_timestamp)
}
