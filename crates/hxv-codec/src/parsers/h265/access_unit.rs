//! H.265 访问单元 (Access Unit) 组装.
//!
//! HX 录像把一个访问单元拆成多个视频块写入 (VPS、SPS、PPS、SEI 和切片各占一块),
//! 只有最后一个切片块携带可用的时间戳. 组装器按块顺序累积负载,
//! 遇到 TRAIL_R 或 IDR_W_RADL 时输出一个完整访问单元.

use bytes::{Bytes, BytesMut};
use hxv_core::Rational;
use log::trace;

use super::nal::classify;
use crate::packet::Packet;

/// 一个完整的 H.265 访问单元 (Annex B 字节流)
#[derive(Debug, Clone)]
pub struct AccessUnit {
    /// 显示时间戳 (毫秒)
    pub pts: i64,
    /// 解码时间戳 (与 pts 相同)
    pub dts: i64,
    /// 时长 (毫秒, None 表示未知)
    pub duration: Option<i64>,
    /// 按到达顺序拼接的所有块负载
    pub payload: Bytes,
    /// 结束该访问单元的切片是否为 IDR
    pub is_keyframe: bool,
}

impl AccessUnit {
    /// 转换为数据包
    pub fn into_packet(self, stream_index: usize, time_base: Rational) -> Packet {
        let mut pkt = Packet::from_data(self.payload);
        pkt.stream_index = stream_index;
        pkt.pts = self.pts;
        pkt.dts = self.dts;
        pkt.duration = self.duration;
        pkt.time_base = time_base;
        pkt.is_keyframe = self.is_keyframe;
        pkt
    }
}

/// 组装器状态
#[derive(Debug, Default)]
enum State {
    /// 缓冲区为空
    #[default]
    Empty,
    /// 已累积若干块, 等待结束切片
    Accumulating(BytesMut),
}

/// 访问单元组装器
///
/// 每个视频块的负载依次调用 [`push`](Self::push); 流结束时调用
/// [`finish`](Self::finish) 丢弃未完成的缓冲.
#[derive(Debug, Default)]
pub struct AccessUnitAssembler {
    state: State,
    /// 已输出的访问单元数量
    emitted: u64,
}

impl AccessUnitAssembler {
    /// 创建组装器
    pub fn new() -> Self {
        Self::default()
    }

    /// 追加一个视频块的负载
    ///
    /// 负载以 TRAIL_R 或 IDR_W_RADL 开头时, 连同之前累积的数据一起作为访问单元输出,
    /// 时间戳与时长取自本块. 无法识别 NAL 类型的负载按非结束块处理.
    pub fn push(&mut self, payload: &[u8], pts: i64, duration: Option<i64>) -> Option<AccessUnit> {
        let mut buf = match std::mem::take(&mut self.state) {
            State::Empty => BytesMut::with_capacity(payload.len()),
            State::Accumulating(buf) => buf,
        };
        buf.extend_from_slice(payload);

        let nal_type = classify(payload);
        match nal_type {
            Some(t) if t.terminates_access_unit() => {
                self.emitted += 1;
                Some(AccessUnit {
                    pts,
                    dts: pts,
                    duration,
                    payload: buf.freeze(),
                    is_keyframe: t.marks_keyframe(),
                })
            }
            other => {
                if other.is_none() {
                    trace!("视频负载开头没有可识别的 NAL, 累积 {} 字节", payload.len());
                }
                self.state = State::Accumulating(buf);
                None
            }
        }
    }

    /// 当前缓冲的字节数
    pub fn pending_len(&self) -> usize {
        match &self.state {
            State::Empty => 0,
            State::Accumulating(buf) => buf.len(),
        }
    }

    /// 已输出的访问单元数量
    pub fn emitted(&self) -> u64 {
        self.emitted
    }

    /// 结束组装, 丢弃未完成的访问单元, 返回被丢弃的字节数
    pub fn finish(&mut self) -> usize {
        match std::mem::take(&mut self.state) {
            State::Empty => 0,
            State::Accumulating(buf) => buf.len(),
        }
    }
}
