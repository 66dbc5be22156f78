//! 封装器 (Muxer) trait 定义.

use hxv_codec::Packet;
use hxv_core::HxResult;

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::stream::Stream;

/// 封装器 trait
///
/// 使用流程:
/// 1. 调用 `write_header()` 写入容器头部
/// 2. 按时间戳递增顺序循环调用 `write_packet()`
/// 3. 调用 `write_trailer()` 完成封装
pub trait Muxer: Send {
    /// 获取格式标识
    fn format_id(&self) -> FormatId;

    /// 获取格式名称
    fn name(&self) -> &str;

    /// 检查流能否封装, 在创建输出文件之前调用
    fn check_streams(&self, _streams: &[Stream]) -> HxResult<()> {
        Ok(())
    }

    /// 写入容器头部
    fn write_header(&mut self, io: &mut IoContext, streams: &[Stream]) -> HxResult<()>;

    /// 写入一个数据包
    fn write_packet(&mut self, io: &mut IoContext, packet: &Packet) -> HxResult<()>;

    /// 写入容器尾部, 完成封装
    fn write_trailer(&mut self, io: &mut IoContext) -> HxResult<()>;
}
