//! 输出容器.
//!
//! 在 [`Muxer`] 之上提供按流声明、按包写入的接口. 格式或编解码器不受支持时
//! 在创建输出文件之前就返回 `HxError::UnsupportedFormat`.

use std::path::{Path, PathBuf};

use hxv_codec::parsers::h265::nal::split_hevc_annex_b;
use hxv_codec::{CodecId, Packet};
use hxv_core::{HxError, HxResult, MediaType, Rational, SampleFormat};
use hxv_format::{FormatId, FormatRegistry, IoContext, Muxer, Stream};
use log::{debug, warn};

/// 输出容器
pub struct OutputContainer {
    path: PathBuf,
    format: FormatId,
    /// 写入头部时才创建
    io: Option<IoContext>,
    muxer: Box<dyn Muxer>,
    streams: Vec<Stream>,
    header_written: bool,
    packets_written: u64,
}

impl OutputContainer {
    /// 创建输出容器
    ///
    /// 输出文件在写入第一个数据包或关闭时才创建, 流无法封装时不会留下文件.
    pub fn open(registry: &FormatRegistry, path: impl AsRef<Path>, format: FormatId) -> HxResult<Self> {
        let path = path.as_ref().to_path_buf();
        let muxer = registry.create_muxer(format)?;
        debug!("输出: {} ({})", path.display(), format);
        Ok(Self {
            path,
            format,
            io: None,
            muxer,
            streams: Vec::new(),
            header_written: false,
            packets_written: 0,
        })
    }

    /// 输出文件路径
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// 输出格式
    pub fn format(&self) -> FormatId {
        self.format
    }

    /// 已写入的数据包数
    pub fn packets_written(&self) -> u64 {
        self.packets_written
    }

    /// 声明一条视频流, 返回流索引
    pub fn declare_video_stream(
        &mut self,
        codec_id: CodecId,
        width: u32,
        height: u32,
        time_base: Rational,
    ) -> HxResult<usize> {
        let index = self.streams.len();
        self.declare_stream(Stream::video(index, codec_id, width, height, time_base))
    }

    /// 声明一条音频流 (S16 采样, 时间基 1/1000), 返回流索引
    pub fn declare_audio_stream(
        &mut self,
        codec_id: CodecId,
        sample_rate: u32,
        channels: u32,
    ) -> HxResult<usize> {
        let index = self.streams.len();
        self.declare_stream(Stream::audio(
            index,
            codec_id,
            sample_rate,
            channels,
            SampleFormat::S16,
            Rational::MILLI,
        ))
    }

    /// 声明一条已有的流 (保留 extra_data 等信息), 返回新的流索引
    pub fn declare_stream(&mut self, mut stream: Stream) -> HxResult<usize> {
        if self.header_written {
            return Err(HxError::InvalidArgument(
                "已开始写入数据, 不能再声明新的流".into(),
            ));
        }
        let index = self.streams.len();
        stream.index = index;
        self.streams.push(stream);
        Ok(index)
    }

    /// 写入一个数据包
    ///
    /// `pts`/`dts`/`duration` 以流的时间基为单位. 音频包均为关键帧,
    /// 视频包含 IDR_W_RADL 切片时为关键帧, 与访问单元组装的判定一致.
    pub fn write_packet(
        &mut self,
        stream: usize,
        pts: i64,
        dts: i64,
        duration: Option<i64>,
        payload: &[u8],
    ) -> HxResult<()> {
        let Some(s) = self.streams.get(stream) else {
            return Err(HxError::StreamNotFound(stream));
        };

        let mut pkt = Packet::from_data(payload.to_vec());
        pkt.stream_index = stream;
        pkt.pts = pts;
        pkt.dts = dts;
        pkt.duration = duration;
        pkt.time_base = s.time_base;
        pkt.is_keyframe = packet_is_keyframe(s.media_type, payload);
        self.write(&pkt)
    }

    /// 写入一个已构造好的数据包
    pub fn write(&mut self, packet: &Packet) -> HxResult<()> {
        if packet.stream_index >= self.streams.len() {
            return Err(HxError::StreamNotFound(packet.stream_index));
        }
        self.ensure_header()?;
        let Some(io) = self.io.as_mut() else {
            return Err(HxError::InvalidData("输出文件未打开".into()));
        };
        self.muxer.write_packet(io, packet)?;
        self.packets_written += 1;
        Ok(())
    }

    /// 写入尾部并关闭
    ///
    /// 失败时删除已创建的输出文件.
    pub fn close(mut self) -> HxResult<()> {
        let result = self.finish();
        if result.is_err() {
            self.discard();
        }
        result
    }

    /// 放弃输出, 删除已创建的输出文件
    pub fn abort(mut self) {
        self.discard();
    }

    fn finish(&mut self) -> HxResult<()> {
        self.ensure_header()?;
        let Some(io) = self.io.as_mut() else {
            return Err(HxError::InvalidData("输出文件未打开".into()));
        };
        self.muxer.write_trailer(io)?;
        io.flush()?;
        debug!(
            "输出完成: {}, {} 个数据包",
            self.path.display(),
            self.packets_written
        );
        Ok(())
    }

    fn ensure_header(&mut self) -> HxResult<()> {
        if self.header_written {
            return Ok(());
        }
        self.muxer.check_streams(&self.streams)?;
        let io = self.io.insert(IoContext::open_write(&self.path)?);
        self.muxer.write_header(io, &self.streams)?;
        self.header_written = true;
        Ok(())
    }

    fn discard(&mut self) {
        // 文件句柄先关闭再删除
        if self.io.take().is_none() {
            return;
        }
        match std::fs::remove_file(&self.path) {
            Ok(()) => warn!("已删除不完整的输出文件 {}", self.path.display()),
            Err(e) => warn!("无法删除不完整的输出文件 {}: {e}", self.path.display()),
        }
    }
}

/// 音频包总是关键帧, 视频包含 IDR_W_RADL 切片时为关键帧
fn packet_is_keyframe(media_type: MediaType, payload: &[u8]) -> bool {
    match media_type {
        MediaType::Audio => true,
        MediaType::Video => split_hevc_annex_b(payload)
            .iter()
            .any(|nalu| nalu.nal_type.marks_keyframe()),
    }
}
