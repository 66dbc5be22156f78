//! 重封装选项.
//!
//! 可由命令行参数构造, 也可从 JSON 文件加载, 缺省字段取默认值.

use std::path::Path;

use hxv_core::{HxError, HxResult};
use hxv_format::demuxers::hx::recovery::DEFAULT_CHUNK_SIZE;
use serde::{Deserialize, Serialize};

/// 重封装选项
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RewrapOptions {
    /// 输出格式 ("mkv", "mp4", "ts")
    pub format: String,
    /// 是否覆盖已存在的输出文件
    pub overwrite: bool,
    /// 文件头损坏或扫描提前结束时是否启用恢复扫描
    pub recover: bool,
    /// 恢复扫描分块大小 (字节)
    pub recovery_chunk_size: usize,
}

impl Default for RewrapOptions {
    fn default() -> Self {
        Self {
            format: "mkv".to_string(),
            overwrite: false,
            recover: false,
            recovery_chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl RewrapOptions {
    /// 从 JSON 字符串解析
    pub fn from_json(text: &str) -> HxResult<Self> {
        let options: Self = serde_json::from_str(text)
            .map_err(|e| HxError::InvalidArgument(format!("配置解析失败: {e}")))?;
        if options.recovery_chunk_size == 0 {
            return Err(HxError::InvalidArgument(
                "recovery_chunk_size 不能为 0".into(),
            ));
        }
        Ok(options)
    }

    /// 从 JSON 文件加载
    pub fn from_json_file(path: impl AsRef<Path>) -> HxResult<Self> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }
}
