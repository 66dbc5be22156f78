//! 统一错误类型定义.
//!
//! 所有 hxv crate 共用的错误类型, 支持跨模块传播.
//!
//! 注意: 块级截断 (文件在块中途结束, 或遇到无法识别的标签) 不属于错误,
//! 扫描器会将其视为正常的流结束并返回已收集的块.

use std::fmt;

use thiserror::Error;

/// HX 框架统一错误类型
#[derive(Debug, Error)]
pub enum HxError {
    /// 无效参数
    #[error("无效参数: {0}")]
    InvalidArgument(String),

    /// 文件头魔数无法识别 (既不是 HXVT 也不是 HXVS)
    #[error("文件头魔数无法识别: {}", DisplayTag(.0))]
    BadMagic([u8; 4]),

    /// 无效数据 (损坏的码流等)
    #[error("无效数据: {0}")]
    InvalidData(String),

    /// I/O 错误
    #[error("I/O 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 已到达流末尾
    #[error("已到达流末尾")]
    Eof,

    /// 输出容器/编解码器组合不受支持
    #[error("不支持的输出格式: {0}")]
    UnsupportedFormat(String),

    /// 未找到指定的容器格式
    #[error("未找到容器格式: {0}")]
    FormatNotFound(String),

    /// 未找到指定的流
    #[error("未找到流: 索引 {0}")]
    StreamNotFound(usize),

    /// 输入文件中没有解析出任何音视频块
    #[error("未解析出任何数据块: {0}")]
    NoBlocks(String),

    /// 输出文件已存在且未允许覆盖
    #[error("输出文件已存在: {0}")]
    OutputExists(String),
}

/// HX 框架统一 Result 类型
pub type HxResult<T> = Result<T, HxError>;

/// 以可读形式显示 4 字节标签, 不可打印字节用十六进制表示
struct DisplayTag<'a>(&'a [u8; 4]);

impl fmt::Display for DisplayTag<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.iter().all(|b| b.is_ascii_graphic()) {
            for &b in self.0 {
                write!(f, "{}", b as char)?;
            }
            Ok(())
        } else {
            write!(
                f,
                "{:02X} {:02X} {:02X} {:02X}",
                self.0[0], self.0[1], self.0[2], self.0[3]
            )
        }
    }
}
