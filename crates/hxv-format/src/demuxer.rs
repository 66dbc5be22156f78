//! 解封装器 (Demuxer) trait 定义.

use hxv_codec::Packet;
use hxv_core::HxResult;

use crate::format_id::FormatId;
use crate::io::IoContext;
use crate::stream::Stream;

/// 解封装器 trait
///
/// 使用流程:
/// 1. 调用 `open()` 打开容器并解析头部
/// 2. 调用 `streams()` 获取流信息
/// 3. 循环调用 `read_packet()` 读取数据包, 直到返回 `HxError::Eof`
pub trait Demuxer: Send {
    /// 获取格式标识
    fn format_id(&self) -> FormatId;

    /// 获取格式名称
    fn name(&self) -> &str;

    /// 打开容器并解析头部信息
    fn open(&mut self, io: &mut IoContext) -> HxResult<()>;

    /// 获取所有流信息
    fn streams(&self) -> &[Stream];

    /// 读取下一个数据包
    ///
    /// # 返回
    /// - `Ok(packet)`: 成功读取一个数据包
    /// - `Err(HxError::Eof)`: 已到达文件末尾
    fn read_packet(&mut self, io: &mut IoContext) -> HxResult<Packet>;

    /// 获取容器时长 (秒), None 表示未知
    fn duration(&self) -> Option<f64>;
}
