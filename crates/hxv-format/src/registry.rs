//! 容器格式注册表.
//!
//! 管理已注册的解封装器/封装器, 支持按格式标识查找和自动探测.

use std::collections::HashMap;

use hxv_core::{HxError, HxResult};
use log::debug;

use crate::demuxer::Demuxer;
use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::muxer::Muxer;
use crate::probe::{FormatProbe, ProbeResult};

/// 解封装器工厂函数类型
pub type DemuxerFactory = fn() -> HxResult<Box<dyn Demuxer>>;

/// 封装器工厂函数类型
pub type MuxerFactory = fn() -> HxResult<Box<dyn Muxer>>;

/// 探测时读取的文件头部字节数
const PROBE_SIZE: u64 = 4096;

/// 容器格式注册表
#[derive(Default)]
pub struct FormatRegistry {
    /// 解封装器工厂映射
    demuxers: HashMap<FormatId, DemuxerEntry>,
    /// 封装器工厂映射
    muxers: HashMap<FormatId, MuxerEntry>,
    /// 格式探测器列表
    probes: Vec<Box<dyn FormatProbe + Send + Sync>>,
}

/// 解封装器注册条目
struct DemuxerEntry {
    name: String,
    factory: DemuxerFactory,
}

/// 封装器注册条目
struct MuxerEntry {
    name: String,
    factory: MuxerFactory,
}

impl FormatRegistry {
    /// 创建空的注册表
    pub fn new() -> Self {
        Self::default()
    }

    /// 注册一个解封装器
    pub fn register_demuxer(
        &mut self,
        format_id: FormatId,
        name: impl Into<String>,
        factory: DemuxerFactory,
    ) {
        self.demuxers.insert(
            format_id,
            DemuxerEntry {
                name: name.into(),
                factory,
            },
        );
    }

    /// 注册一个封装器
    pub fn register_muxer(
        &mut self,
        format_id: FormatId,
        name: impl Into<String>,
        factory: MuxerFactory,
    ) {
        self.muxers.insert(
            format_id,
            MuxerEntry {
                name: name.into(),
                factory,
            },
        );
    }

    /// 注册一个格式探测器
    pub fn register_probe(&mut self, probe: Box<dyn FormatProbe + Send + Sync>) {
        self.probes.push(probe);
    }

    /// 创建指定格式的解封装器实例
    pub fn create_demuxer(&self, format_id: FormatId) -> HxResult<Box<dyn Demuxer>> {
        let entry = self.demuxers.get(&format_id).ok_or_else(|| {
            HxError::FormatNotFound(format!("未找到 {} 的解封装器", format_id))
        })?;
        debug!("创建解封装器: {}", entry.name);
        (entry.factory)()
    }

    /// 创建指定格式的封装器实例
    ///
    /// 格式已知但没有注册封装器时返回 `HxError::UnsupportedFormat`.
    pub fn create_muxer(&self, format_id: FormatId) -> HxResult<Box<dyn Muxer>> {
        let entry = self.muxers.get(&format_id).ok_or_else(|| {
            HxError::UnsupportedFormat(format!("没有 {} 格式的封装器", format_id))
        })?;
        debug!("创建封装器: {}", entry.name);
        (entry.factory)()
    }

    /// 是否有指定格式的封装器
    pub fn has_muxer(&self, format_id: FormatId) -> bool {
        self.muxers.contains_key(&format_id)
    }

    /// 探测数据的容器格式
    ///
    /// 遍历所有已注册的探测器, 返回置信度最高的结果.
    pub fn probe(&self, data: &[u8], filename: Option<&str>) -> Option<ProbeResult> {
        let mut best: Option<ProbeResult> = None;
        for probe in &self.probes {
            if let Some(score) = probe.probe(data, filename) {
                let is_better = best.as_ref().is_none_or(|b| score > b.score);
                if is_better {
                    best = Some(ProbeResult {
                        format_id: probe.format_id(),
                        score,
                    });
                }
            }
        }
        best
    }

    /// 探测输入文件格式, 完成后 seek 回起始位置
    pub fn probe_input(
        &self,
        io: &mut IoContext,
        filename: Option<&str>,
    ) -> HxResult<ProbeResult> {
        let probe_size = io.size().unwrap_or(PROBE_SIZE).min(PROBE_SIZE) as usize;
        let mut probe_buf = vec![0u8; probe_size];
        let n = io.read_up_to(&mut probe_buf)?;
        probe_buf.truncate(n);

        let result = self
            .probe(&probe_buf, filename)
            .ok_or_else(|| HxError::FormatNotFound("无法识别输入文件格式".to_string()))?;

        io.seek(std::io::SeekFrom::Start(0))?;
        Ok(result)
    }

    /// 自动探测格式, 创建对应的解封装器并调用 `open()`
    pub fn open_input(
        &self,
        io: &mut IoContext,
        filename: Option<&str>,
    ) -> HxResult<Box<dyn Demuxer>> {
        let result = self.probe_input(io, filename)?;
        let mut demuxer = self.create_demuxer(result.format_id)?;
        demuxer.open(io)?;
        Ok(demuxer)
    }
}
