//! Matroska 封装器.
//!
//! 将 HX 解封装得到的 H.265 访问单元与 PCM 音频写入 Matroska (.mkv) 容器.
//!
//! # 输出结构
//! ```text
//! EBML Header (DocType: "matroska")
//! Segment (unknown size)
//! ├── Info (TimecodeScale = 1ms, Duration 回填)
//! ├── Tracks (每个流一个 TrackEntry)
//! └── Cluster... (SimpleBlock / BlockGroup)
//! ```
//!
//! 时长已知的数据包写为 BlockGroup (带 BlockDuration), 其余写为 SimpleBlock.
//! 视频流带 hvcC 时, Annex B 负载转换为 4 字节长度前缀格式.

use hxv_codec::parsers::h265::nal::hevc_annex_b_to_hvcc;
use hxv_codec::{CodecId, Packet};
use hxv_core::{HxError, HxResult, MediaType, Rational, Timestamp};
use log::debug;

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::muxer::Muxer;
use crate::stream::{Stream, StreamParams};

// ============================================================
// EBML 元素 ID 常量
// ============================================================

const EBML_HEADER: u32 = 0x1A45_DFA3;
const EBML_VERSION: u32 = 0x4286;
const EBML_READ_VERSION: u32 = 0x42F7;
const EBML_MAX_ID_LENGTH: u32 = 0x42F2;
const EBML_MAX_SIZE_LENGTH: u32 = 0x42F3;
const EBML_DOC_TYPE: u32 = 0x4282;
const EBML_DOC_TYPE_VERSION: u32 = 0x4287;
const EBML_DOC_TYPE_READ_VERSION: u32 = 0x4285;

const SEGMENT: u32 = 0x1853_8067;
const SEGMENT_INFO: u32 = 0x1549_A966;
const INFO_TIMESCALE: u32 = 0x002A_D7B1;
const INFO_DURATION: u32 = 0x4489;
const INFO_MUXING_APP: u32 = 0x4D80;
const INFO_WRITING_APP: u32 = 0x5741;
const TRACKS: u32 = 0x1654_AE6B;
const TRACK_ENTRY: u32 = 0xAE;
const TRACK_NUMBER: u32 = 0xD7;
const TRACK_UID: u32 = 0x73C5;
const TRACK_TYPE: u32 = 0x83;
const TRACK_FLAG_LACING: u32 = 0x9C;
const TRACK_CODEC_ID: u32 = 0x86;
const TRACK_CODEC_PRIVATE: u32 = 0x63A2;
const VIDEO_SETTINGS: u32 = 0xE0;
const VIDEO_PIXEL_WIDTH: u32 = 0xB0;
const VIDEO_PIXEL_HEIGHT: u32 = 0xBA;
const AUDIO_SETTINGS: u32 = 0xE1;
const AUDIO_SAMPLING_FREQ: u32 = 0xB5;
const AUDIO_CHANNELS: u32 = 0x9F;
const AUDIO_BIT_DEPTH: u32 = 0x6264;
const CLUSTER: u32 = 0x1F43_B675;
const CLUSTER_TIMESTAMP: u32 = 0xE7;
const SIMPLE_BLOCK: u32 = 0xA3;
const BLOCK_GROUP: u32 = 0xA0;
const BLOCK: u32 = 0xA1;
const BLOCK_DURATION: u32 = 0x9B;
const REFERENCE_BLOCK: u32 = 0xFB;

/// TimecodeScale: 1ms (1_000_000 纳秒)
const TIMESCALE_NS: u64 = 1_000_000;

/// 每个 Cluster 的最大时长 (毫秒)
const MAX_CLUSTER_DURATION_MS: i64 = 5000;

/// 写入 Info 的应用名
const APP_NAME: &str = "hxv";

/// Matroska 封装器
pub struct MkvMuxer {
    /// 轨道信息
    tracks: Vec<MkvTrack>,
    /// 当前 Cluster 的时间戳 (毫秒)
    cluster_timestamp: i64,
    /// 是否已开始一个 Cluster
    cluster_open: bool,
    /// Cluster 数据缓冲
    cluster_buf: Vec<u8>,
    /// Info 中 Duration 数据的绝对偏移 (用于 trailer 回填)
    duration_offset: u64,
    /// 已写入数据的最大结束时间 (毫秒)
    max_end_ms: i64,
    /// 已写入的块数
    blocks_written: u64,
}

struct MkvTrack {
    stream_index: usize,
    track_number: u8,
    time_base: Rational,
    /// 负载是否需要从 Annex B 转换为长度前缀格式
    length_prefixed: bool,
    /// 最近一个关键帧的时间戳 (毫秒)
    last_keyframe_ms: Option<i64>,
}

impl MkvMuxer {
    /// 创建 Matroska 封装器 (工厂函数)
    pub fn create() -> HxResult<Box<dyn Muxer>> {
        Ok(Box::new(Self::new()))
    }

    /// 创建封装器
    pub fn new() -> Self {
        Self {
            tracks: Vec::new(),
            cluster_timestamp: -1,
            cluster_open: false,
            cluster_buf: Vec::new(),
            duration_offset: 0,
            max_end_ms: 0,
            blocks_written: 0,
        }
    }

    /// 刷新当前 Cluster 到输出
    fn flush_cluster(&mut self, io: &mut IoContext) -> HxResult<()> {
        if !self.cluster_open || self.cluster_buf.is_empty() {
            return Ok(());
        }

        write_element_id(io, CLUSTER)?;
        write_element_size(io, self.cluster_buf.len() as u64)?;
        io.write_all(&self.cluster_buf)?;

        self.cluster_buf.clear();
        self.cluster_open = false;
        Ok(())
    }

    /// 开始新 Cluster
    fn start_cluster(&mut self, timestamp_ms: i64) {
        self.cluster_buf.clear();
        write_uint_full_element(
            &mut self.cluster_buf,
            CLUSTER_TIMESTAMP,
            timestamp_ms.max(0) as u64,
        );
        self.cluster_timestamp = timestamp_ms.max(0);
        self.cluster_open = true;
    }
}

impl Default for MkvMuxer {
    fn default() -> Self {
        Self::new()
    }
}

/// 将时间基下的数值换算为毫秒
fn to_ms(value: i64, time_base: Rational) -> i64 {
    let ts = Timestamp::new(value, time_base);
    if ts.is_valid() {
        ts.rescale(Rational::MILLI).pts
    } else {
        value
    }
}

impl Muxer for MkvMuxer {
    fn format_id(&self) -> FormatId {
        FormatId::Matroska
    }

    fn name(&self) -> &str {
        "matroska"
    }

    fn check_streams(&self, streams: &[Stream]) -> HxResult<()> {
        if streams.is_empty() {
            return Err(HxError::InvalidArgument("MKV: 至少需要一个流".into()));
        }
        for stream in streams {
            codec_id_to_mkv(stream.codec_id)?;
        }
        Ok(())
    }

    fn write_header(&mut self, io: &mut IoContext, streams: &[Stream]) -> HxResult<()> {
        self.check_streams(streams)?;

        // 先构建全部 TrackEntry, 编解码器不受支持时不写入任何字节
        let mut tracks_content = Vec::new();
        for (i, stream) in streams.iter().enumerate() {
            let track_number = i as u8 + 1;
            tracks_content.extend_from_slice(&build_track_entry(stream, track_number)?);
            self.tracks.push(MkvTrack {
                stream_index: stream.index,
                track_number,
                time_base: stream.time_base,
                length_prefixed: stream.codec_id == CodecId::H265 && !stream.extra_data.is_empty(),
                last_keyframe_ms: None,
            });
        }

        // EBML Header
        let mut ebml_content = Vec::new();
        write_uint_full_element(&mut ebml_content, EBML_VERSION, 1);
        write_uint_full_element(&mut ebml_content, EBML_READ_VERSION, 1);
        write_uint_full_element(&mut ebml_content, EBML_MAX_ID_LENGTH, 4);
        write_uint_full_element(&mut ebml_content, EBML_MAX_SIZE_LENGTH, 8);
        write_string_element_buf(&mut ebml_content, EBML_DOC_TYPE, "matroska");
        write_uint_full_element(&mut ebml_content, EBML_DOC_TYPE_VERSION, 4);
        write_uint_full_element(&mut ebml_content, EBML_DOC_TYPE_READ_VERSION, 2);

        write_element_id(io, EBML_HEADER)?;
        write_element_size(io, ebml_content.len() as u64)?;
        io.write_all(&ebml_content)?;

        // Segment (unknown size)
        write_element_id(io, SEGMENT)?;
        io.write_all(&[0x01, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF, 0xFF])?;

        // Info, Duration 先写 0.0, trailer 回填
        let mut info_content = Vec::new();
        write_uint_full_element(&mut info_content, INFO_TIMESCALE, TIMESCALE_NS);
        write_string_element_buf(&mut info_content, INFO_MUXING_APP, APP_NAME);
        write_string_element_buf(&mut info_content, INFO_WRITING_APP, APP_NAME);
        write_element_id_buf(&mut info_content, INFO_DURATION);
        write_element_size_buf(&mut info_content, 8);
        let duration_data_pos = info_content.len();
        info_content.extend_from_slice(&0.0f64.to_be_bytes());

        write_element_id(io, SEGMENT_INFO)?;
        write_element_size(io, info_content.len() as u64)?;
        let info_data_start = io.position()?;
        io.write_all(&info_content)?;
        self.duration_offset = info_data_start + duration_data_pos as u64;

        // Tracks
        write_element_id(io, TRACKS)?;
        write_element_size(io, tracks_content.len() as u64)?;
        io.write_all(&tracks_content)?;

        debug!(
            "MKV: 写入 EBML header + Segment + Info + Tracks, {} 个轨道",
            streams.len()
        );
        Ok(())
    }

    fn write_packet(&mut self, io: &mut IoContext, packet: &Packet) -> HxResult<()> {
        let Some(track_pos) = self
            .tracks
            .iter()
            .position(|t| t.stream_index == packet.stream_index)
        else {
            return Err(HxError::StreamNotFound(packet.stream_index));
        };

        let (track_number, time_base, length_prefixed) = {
            let t = &self.tracks[track_pos];
            (t.track_number, t.time_base, t.length_prefixed)
        };
        let timestamp_ms = to_ms(packet.pts, time_base);
        let duration_ms = packet.duration.map(|d| to_ms(d, time_base));

        let need_new_cluster = !self.cluster_open
            || (timestamp_ms - self.cluster_timestamp >= MAX_CLUSTER_DURATION_MS);
        if need_new_cluster {
            self.flush_cluster(io)?;
            self.start_cluster(timestamp_ms);
        }

        let end_ms = timestamp_ms + duration_ms.unwrap_or(0);
        if end_ms > self.max_end_ms {
            self.max_end_ms = end_ms;
        }

        let relative_ts = (timestamp_ms - self.cluster_timestamp)
            .clamp(i16::MIN as i64, i16::MAX as i64) as i16;

        let converted;
        let payload: &[u8] = if length_prefixed {
            converted = hevc_annex_b_to_hvcc(&packet.data);
            &converted
        } else {
            &packet.data
        };

        // Block 头: track_number (1 字节 VINT) + 相对时间戳 (2 字节 BE) + flags
        let mut block_data = Vec::with_capacity(payload.len() + 4);
        block_data.push(0x80 | track_number);
        block_data.extend_from_slice(&relative_ts.to_be_bytes());

        let track = &mut self.tracks[track_pos];
        let reference = if packet.is_keyframe {
            track.last_keyframe_ms = Some(timestamp_ms);
            None
        } else {
            Some(track.last_keyframe_ms.map_or(-1, |k| k - timestamp_ms))
        };

        match duration_ms {
            None => {
                let flags: u8 = if packet.is_keyframe { 0x80 } else { 0x00 };
                block_data.push(flags);
                block_data.extend_from_slice(payload);
                write_binary_element_buf(&mut self.cluster_buf, SIMPLE_BLOCK, &block_data);
            }
            Some(duration) => {
                block_data.push(0x00);
                block_data.extend_from_slice(payload);

                let mut group = Vec::with_capacity(block_data.len() + 16);
                write_binary_element_buf(&mut group, BLOCK, &block_data);
                write_uint_full_element(&mut group, BLOCK_DURATION, duration.max(0) as u64);
                if let Some(reference) = reference {
                    write_int_full_element(&mut group, REFERENCE_BLOCK, reference);
                }
                write_binary_element_buf(&mut self.cluster_buf, BLOCK_GROUP, &group);
            }
        }

        self.blocks_written += 1;
        Ok(())
    }

    fn write_trailer(&mut self, io: &mut IoContext) -> HxResult<()> {
        self.flush_cluster(io)?;

        if io.is_seekable() && self.duration_offset > 0 {
            let duration_ms = self.max_end_ms as f64;
            let current = io.position()?;
            io.seek(std::io::SeekFrom::Start(self.duration_offset))?;
            io.write_all(&duration_ms.to_be_bytes())?;
            io.seek(std::io::SeekFrom::Start(current))?;
        }
        io.flush()?;

        debug!(
            "MKV: trailer 完成, {} 个块, duration={}ms",
            self.blocks_written, self.max_end_ms
        );
        Ok(())
    }
}

// ============================================================
// EBML 写入工具
// ============================================================

/// 写 EBML 元素 ID 到 IoContext
fn write_element_id(io: &mut IoContext, id: u32) -> HxResult<()> {
    io.write_all(&id_to_bytes(id))
}

/// 写 EBML 元素 ID 到缓冲区
fn write_element_id_buf(buf: &mut Vec<u8>, id: u32) {
    buf.extend_from_slice(&id_to_bytes(id));
}

/// 将 ID 转为字节 (保留前导位)
fn id_to_bytes(id: u32) -> Vec<u8> {
    let bytes = id.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count().min(3);
    bytes[skip..].to_vec()
}

/// 写 EBML 元素大小 (VINT 编码) 到 IoContext
fn write_element_size(io: &mut IoContext, size: u64) -> HxResult<()> {
    io.write_all(&size_to_vint(size))
}

/// 写 EBML 元素大小到缓冲区
fn write_element_size_buf(buf: &mut Vec<u8>, size: u64) {
    buf.extend_from_slice(&size_to_vint(size));
}

/// 将大小编码为 VINT
///
/// 全 1 的值保留给 "未知大小", 因此每种长度的上限都要减一.
fn size_to_vint(size: u64) -> Vec<u8> {
    if size < 0x7F {
        vec![0x80 | size as u8]
    } else if size < 0x3FFF {
        vec![0x40 | (size >> 8) as u8, size as u8]
    } else if size < 0x1F_FFFF {
        vec![0x20 | (size >> 16) as u8, (size >> 8) as u8, size as u8]
    } else if size < 0x0FFF_FFFF {
        vec![
            0x10 | (size >> 24) as u8,
            (size >> 16) as u8,
            (size >> 8) as u8,
            size as u8,
        ]
    } else {
        let mut bytes = vec![0x01];
        for i in (0..7).rev() {
            bytes.push((size >> (i * 8)) as u8);
        }
        bytes
    }
}

/// 写 uint 元素 (ID + size + data)
fn write_uint_full_element(buf: &mut Vec<u8>, id: u32, value: u64) {
    write_element_id_buf(buf, id);
    let bytes = uint_to_bytes(value);
    write_element_size_buf(buf, bytes.len() as u64);
    buf.extend_from_slice(&bytes);
}

/// uint 转最小字节数
fn uint_to_bytes(value: u64) -> Vec<u8> {
    let bytes = value.to_be_bytes();
    let skip = bytes.iter().take_while(|&&b| b == 0).count().min(7);
    bytes[skip..].to_vec()
}

/// 写有符号整数元素 (补码, 最小字节数)
fn write_int_full_element(buf: &mut Vec<u8>, id: u32, value: i64) {
    let bytes = value.to_be_bytes();
    let mut skip = 0;
    while skip < 7 {
        let redundant = (bytes[skip] == 0x00 && bytes[skip + 1] & 0x80 == 0)
            || (bytes[skip] == 0xFF && bytes[skip + 1] & 0x80 != 0);
        if !redundant {
            break;
        }
        skip += 1;
    }
    write_binary_element_buf(buf, id, &bytes[skip..]);
}

/// 写 string 元素
fn write_string_element_buf(buf: &mut Vec<u8>, id: u32, value: &str) {
    write_binary_element_buf(buf, id, value.as_bytes());
}

/// 写 float64 元素
fn write_float_element_buf(buf: &mut Vec<u8>, id: u32, value: f64) {
    write_binary_element_buf(buf, id, &value.to_be_bytes());
}

/// 写 binary 元素
fn write_binary_element_buf(buf: &mut Vec<u8>, id: u32, data: &[u8]) {
    write_element_id_buf(buf, id);
    write_element_size_buf(buf, data.len() as u64);
    buf.extend_from_slice(data);
}

// ============================================================
// TrackEntry 构建
// ============================================================

/// CodecId → Matroska codec string
fn codec_id_to_mkv(codec_id: CodecId) -> HxResult<&'static str> {
    match codec_id {
        CodecId::H264 => Ok("V_MPEG4/ISO/AVC"),
        CodecId::H265 => Ok("V_MPEGH/ISO/HEVC"),
        CodecId::PcmS16le => Ok("A_PCM/INT/LIT"),
        _ => Err(HxError::UnsupportedFormat(format!(
            "MKV: 不支持编解码器 {}",
            codec_id
        ))),
    }
}

/// 构建一个 TrackEntry
fn build_track_entry(stream: &Stream, track_number: u8) -> HxResult<Vec<u8>> {
    let codec_id_str = codec_id_to_mkv(stream.codec_id)?;

    let mut content = Vec::new();
    write_uint_full_element(&mut content, TRACK_NUMBER, track_number as u64);
    write_uint_full_element(&mut content, TRACK_UID, track_number as u64);

    let track_type: u64 = match stream.media_type {
        MediaType::Video => 1,
        MediaType::Audio => 2,
    };
    write_uint_full_element(&mut content, TRACK_TYPE, track_type);
    write_uint_full_element(&mut content, TRACK_FLAG_LACING, 0);
    write_string_element_buf(&mut content, TRACK_CODEC_ID, codec_id_str);

    if !stream.extra_data.is_empty() {
        write_binary_element_buf(&mut content, TRACK_CODEC_PRIVATE, &stream.extra_data);
    }

    match &stream.params {
        StreamParams::Video(v) => {
            let mut video = Vec::new();
            write_uint_full_element(&mut video, VIDEO_PIXEL_WIDTH, v.width as u64);
            write_uint_full_element(&mut video, VIDEO_PIXEL_HEIGHT, v.height as u64);
            write_binary_element_buf(&mut content, VIDEO_SETTINGS, &video);
        }
        StreamParams::Audio(a) => {
            let mut audio = Vec::new();
            write_float_element_buf(&mut audio, AUDIO_SAMPLING_FREQ, a.sample_rate as f64);
            write_uint_full_element(&mut audio, AUDIO_CHANNELS, a.channels as u64);
            if a.sample_format.bytes_per_sample() > 0 {
                write_uint_full_element(
                    &mut audio,
                    AUDIO_BIT_DEPTH,
                    (a.sample_format.bytes_per_sample() * 8) as u64,
                );
            }
            write_binary_element_buf(&mut content, AUDIO_SETTINGS, &audio);
        }
    }

    let mut buf = Vec::new();
    write_binary_element_buf(&mut buf, TRACK_ENTRY, &content);
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use hxv_core::SampleFormat;

    fn video_stream(extra_data: Vec<u8>) -> Stream {
        let mut s = Stream::video(0, CodecId::H265, 704, 480, Rational::MILLI);
        s.extra_data = extra_data;
        s
    }

    fn audio_stream() -> Stream {
        Stream::audio(1, CodecId::PcmS16le, 8000, 1, SampleFormat::S16, Rational::MILLI)
    }

    fn packet(stream_index: usize, pts: i64, duration: Option<i64>, data: Vec<u8>) -> Packet {
        let mut pkt = Packet::from_data(data);
        pkt.stream_index = stream_index;
        pkt.pts = pts;
        pkt.dts = pts;
        pkt.duration = duration;
        pkt.time_base = Rational::MILLI;
        pkt.is_keyframe = true;
        pkt
    }

    fn contains(haystack: &[u8], needle: &[u8]) -> bool {
        haystack.windows(needle.len()).any(|w| w == needle)
    }

    #[test]
    fn test_codec_id_映射() {
        assert_eq!(codec_id_to_mkv(CodecId::H265).unwrap(), "V_MPEGH/ISO/HEVC");
        assert_eq!(codec_id_to_mkv(CodecId::PcmS16le).unwrap(), "A_PCM/INT/LIT");
        assert!(matches!(
            codec_id_to_mkv(CodecId::PcmAlaw),
            Err(HxError::UnsupportedFormat(_))
        ));
    }

    #[test]
    fn test_vint_编码() {
        assert_eq!(size_to_vint(0), vec![0x80]);
        assert_eq!(size_to_vint(126), vec![0xFE]);
        assert_eq!(size_to_vint(127), vec![0x40, 0x7F]);
        assert_eq!(id_to_bytes(0xA3), vec![0xA3]);
        assert_eq!(id_to_bytes(EBML_HEADER), vec![0x1A, 0x45, 0xDF, 0xA3]);
        assert_eq!(uint_to_bytes(0), vec![0]);
        assert_eq!(uint_to_bytes(0x1234), vec![0x12, 0x34]);
    }

    #[test]
    fn test_有符号整数编码() {
        let mut buf = Vec::new();
        write_int_full_element(&mut buf, REFERENCE_BLOCK, -40);
        assert_eq!(buf, vec![0xFB, 0x81, 0xD8]);

        let mut buf = Vec::new();
        write_int_full_element(&mut buf, REFERENCE_BLOCK, 200);
        assert_eq!(buf, vec![0xFB, 0x82, 0x00, 0xC8]);
    }

    #[test]
    fn test_写入_音视频() {
        let mut io = IoContext::from_memory(Vec::new());
        let streams = vec![video_stream(Vec::new()), audio_stream()];
        let mut muxer = MkvMuxer::new();
        muxer.write_header(&mut io, &streams).unwrap();

        muxer
            .write_packet(&mut io, &packet(0, 0, Some(40), vec![0, 0, 0, 1, 0x26, 0x01]))
            .unwrap();
        muxer
            .write_packet(&mut io, &packet(1, 0, Some(20), vec![0x08, 0x00]))
            .unwrap();
        muxer
            .write_packet(&mut io, &packet(0, 40, None, vec![0, 0, 0, 1, 0x02, 0x01]))
            .unwrap();
        muxer.write_trailer(&mut io).unwrap();

        let data = io.memory_data().unwrap();
        assert_eq!(&data[..4], &[0x1A, 0x45, 0xDF, 0xA3]);
        assert!(contains(data, b"matroska"));
        assert!(contains(data, b"V_MPEGH/ISO/HEVC"));
        assert!(contains(data, b"A_PCM/INT/LIT"));
        // 时长已知的包写为 BlockGroup, 最后一个视频包写为 SimpleBlock
        assert!(contains(data, &[BLOCK_DURATION as u8, 0x81, 40]));
        assert!(contains(data, &[SIMPLE_BLOCK as u8]));
        // 无 hvcC 时保留 Annex B 起始码
        assert!(contains(data, &[0, 0, 0, 1, 0x26, 0x01]));
        // Duration 回填为最大结束时间 40ms
        assert!(contains(data, &40.0f64.to_be_bytes()));
        assert_eq!(muxer.blocks_written, 3);
    }

    #[test]
    fn test_长度前缀转换() {
        let mut io = IoContext::from_memory(Vec::new());
        let streams = vec![video_stream(vec![0x01, 0x01, 0x60])];
        let mut muxer = MkvMuxer::new();
        muxer.write_header(&mut io, &streams).unwrap();
        muxer
            .write_packet(&mut io, &packet(0, 0, None, vec![0, 0, 0, 1, 0x26, 0x01, 0xAF]))
            .unwrap();
        muxer.write_trailer(&mut io).unwrap();

        let data = io.memory_data().unwrap();
        assert!(contains(data, &[0, 0, 0, 3, 0x26, 0x01, 0xAF]));
        assert!(!contains(data, &[0, 0, 0, 1, 0x26, 0x01, 0xAF]));
    }

    #[test]
    fn test_不支持的编解码器不写入() {
        let mut io = IoContext::from_memory(Vec::new());
        let stream = Stream::audio(0, CodecId::PcmAlaw, 8000, 1, SampleFormat::U8, Rational::MILLI);
        let mut muxer = MkvMuxer::new();
        assert!(matches!(
            muxer.write_header(&mut io, &[stream]),
            Err(HxError::UnsupportedFormat(_))
        ));
        assert!(io.memory_data().unwrap().is_empty());
    }

    #[test]
    fn test_空流报错() {
        let mut io = IoContext::from_memory(Vec::new());
        let mut muxer = MkvMuxer::new();
        assert!(muxer.write_header(&mut io, &[]).is_err());
    }

    #[test]
    fn test_写入前检查流() {
        let muxer = MkvMuxer::new();
        assert!(muxer.check_streams(&[audio_stream()]).is_ok());
        let alaw = Stream::audio(0, CodecId::PcmAlaw, 8000, 1, SampleFormat::U8, Rational::MILLI);
        assert!(matches!(
            muxer.check_streams(&[audio_stream(), alaw]),
            Err(HxError::UnsupportedFormat(_))
        ));
        assert!(matches!(muxer.check_streams(&[]), Err(HxError::InvalidArgument(_))));
    }

    #[test]
    fn test_未声明的流() {
        let mut io = IoContext::from_memory(Vec::new());
        let mut muxer = MkvMuxer::new();
        muxer.write_header(&mut io, &[audio_stream()]).unwrap();
        assert!(matches!(
            muxer.write_packet(&mut io, &packet(0, 0, None, vec![1])),
            Err(HxError::StreamNotFound(0))
        ));
    }
}
