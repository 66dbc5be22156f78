//! G.711 A-law 音频解码.
//!
//! HX 录像的音频块均为 8000 Hz 单声道 A-law, 每块 160 个采样 (20 ms).
//! A-law 是无记忆的压扩编码, 每个输入字节独立映射为一个 16 位线性采样,
//! 因此解码就是一次查表.

use bytes::Bytes;
use hxv_core::Rational;

use crate::packet::Packet;

/// A-law 码字 → 16 位线性 PCM 查找表
///
/// 下标即 A-law 码字 (已包含 0x55 异或), 与 ITU-T G.711 定义一致.
#[rustfmt::skip]
pub const ALAW_TO_PCM16: [i16; 256] = [
    -5504, -5248, -6016, -5760, -4480, -4224, -4992, -4736,
    -7552, -7296, -8064, -7808, -6528, -6272, -7040, -6784,
    -2752, -2624, -3008, -2880, -2240, -2112, -2496, -2368,
    -3776, -3648, -4032, -3904, -3264, -3136, -3520, -3392,
    -22016, -20992, -24064, -23040, -17920, -16896, -19968, -18944,
    -30208, -29184, -32256, -31232, -26112, -25088, -28160, -27136,
    -11008, -10496, -12032, -11520, -8960, -8448, -9984, -9472,
    -15104, -14592, -16128, -15616, -13056, -12544, -14080, -13568,
    -344, -328, -376, -360, -280, -264, -312, -296,
    -472, -456, -504, -488, -408, -392, -440, -424,
    -88, -72, -120, -104, -24, -8, -56, -40,
    -216, -200, -248, -232, -152, -136, -184, -168,
    -1376, -1312, -1504, -1440, -1120, -1056, -1248, -1184,
    -1888, -1824, -2016, -1952, -1632, -1568, -1760, -1696,
    -688, -656, -752, -720, -560, -528, -624, -592,
    -944, -912, -1008, -976, -816, -784, -880, -848,
    5504, 5248, 6016, 5760, 4480, 4224, 4992, 4736,
    7552, 7296, 8064, 7808, 6528, 6272, 7040, 6784,
    2752, 2624, 3008, 2880, 2240, 2112, 2496, 2368,
    3776, 3648, 4032, 3904, 3264, 3136, 3520, 3392,
    22016, 20992, 24064, 23040, 17920, 16896, 19968, 18944,
    30208, 29184, 32256, 31232, 26112, 25088, 28160, 27136,
    11008, 10496, 12032, 11520, 8960, 8448, 9984, 9472,
    15104, 14592, 16128, 15616, 13056, 12544, 14080, 13568,
    344, 328, 376, 360, 280, 264, 312, 296,
    472, 456, 504, 488, 408, 392, 440, 424,
    88, 72, 120, 104, 24, 8, 56, 40,
    216, 200, 248, 232, 152, 136, 184, 168,
    1376, 1312, 1504, 1440, 1120, 1056, 1248, 1184,
    1888, 1824, 2016, 1952, 1632, 1568, 1760, 1696,
    688, 656, 752, 720, 560, 528, 624, 592,
    944, 912, 1008, 976, 816, 784, 880, 848,
];

/// 解码单个 A-law 字节
#[inline]
pub fn alaw_to_pcm16(byte: u8) -> i16 {
    ALAW_TO_PCM16[byte as usize]
}

/// 将 A-law 数据解码为 PCM S16LE 字节流
///
/// 每个输入字节输出 2 个小端字节.
pub fn decode_alaw(input: &[u8]) -> Vec<u8> {
    let mut out = Vec::with_capacity(input.len() * 2);
    for &byte in input {
        out.extend_from_slice(&alaw_to_pcm16(byte).to_le_bytes());
    }
    out
}

/// 解码后的音频帧
///
/// 每个 HX 音频块产生一帧, 时间戳沿用块的相对时间戳.
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// 显示时间戳 (毫秒)
    pub pts: i64,
    /// 解码时间戳 (与 pts 相同)
    pub dts: i64,
    /// 帧时长 (毫秒, None 表示未知)
    pub duration: Option<i64>,
    /// PCM S16LE 采样数据
    pub pcm: Bytes,
}

impl AudioFrame {
    /// 从 A-law 负载解码出音频帧
    pub fn from_alaw(alaw: &[u8], pts: i64, duration: Option<i64>) -> Self {
        Self {
            pts,
            dts: pts,
            duration,
            pcm: Bytes::from(decode_alaw(alaw)),
        }
    }

    /// 采样数 (单声道)
    pub fn nb_samples(&self) -> usize {
        self.pcm.len() / 2
    }

    /// 转换为数据包
    pub fn into_packet(self, stream_index: usize, time_base: Rational) -> Packet {
        let mut pkt = Packet::from_data(self.pcm);
        pkt.stream_index = stream_index;
        pkt.pts = self.pts;
        pkt.dts = self.dts;
        pkt.duration = self.duration;
        pkt.time_base = time_base;
        pkt.is_keyframe = true;
        pkt
    }
}
