//! 流信息定义.
//!
//! 描述容器中的一条音频或视频流.

use hxv_codec::CodecId;
use hxv_core::{MediaType, Rational, SampleFormat};

/// 流信息
#[derive(Debug, Clone)]
pub struct Stream {
    /// 流索引 (从 0 开始)
    pub index: usize,
    /// 媒体类型
    pub media_type: MediaType,
    /// 编解码器标识
    pub codec_id: CodecId,
    /// 时间基
    pub time_base: Rational,
    /// 流时长 (以 time_base 为单位, None 表示未知)
    pub duration: Option<i64>,
    /// 起始时间 (以 time_base 为单位)
    pub start_time: i64,
    /// 总帧数 (0 表示未知)
    pub nb_frames: u64,
    /// 编解码器私有数据 (H.265 为 hvcC, 为空表示码流自带参数集)
    pub extra_data: Vec<u8>,
    /// 流特定参数
    pub params: StreamParams,
}

impl Stream {
    /// 创建视频流
    pub fn video(
        index: usize,
        codec_id: CodecId,
        width: u32,
        height: u32,
        time_base: Rational,
    ) -> Self {
        Self {
            index,
            media_type: MediaType::Video,
            codec_id,
            time_base,
            duration: None,
            start_time: 0,
            nb_frames: 0,
            extra_data: Vec::new(),
            params: StreamParams::Video(VideoStreamParams { width, height }),
        }
    }

    /// 创建音频流
    pub fn audio(
        index: usize,
        codec_id: CodecId,
        sample_rate: u32,
        channels: u32,
        sample_format: SampleFormat,
        time_base: Rational,
    ) -> Self {
        Self {
            index,
            media_type: MediaType::Audio,
            codec_id,
            time_base,
            duration: None,
            start_time: 0,
            nb_frames: 0,
            extra_data: Vec::new(),
            params: StreamParams::Audio(AudioStreamParams {
                sample_rate,
                channels,
                sample_format,
            }),
        }
    }
}

/// 流特定参数
#[derive(Debug, Clone)]
pub enum StreamParams {
    /// 视频流参数
    Video(VideoStreamParams),
    /// 音频流参数
    Audio(AudioStreamParams),
}

/// 视频流参数
#[derive(Debug, Clone)]
pub struct VideoStreamParams {
    /// 宽度 (像素)
    pub width: u32,
    /// 高度 (像素)
    pub height: u32,
}

/// 音频流参数
#[derive(Debug, Clone)]
pub struct AudioStreamParams {
    /// 采样率 (Hz)
    pub sample_rate: u32,
    /// 声道数
    pub channels: u32,
    /// 采样格式
    pub sample_format: SampleFormat,
}
