//! # hxv-codec
//!
//! HX 录像解析框架的编解码层, 提供 Packet 抽象以及 HX 录像用到的两种码流处理:
//!
//! - **音频**: G.711 A-law → PCM S16LE 解码 ([`decoders::alaw`])
//! - **视频**: H.265 NAL 类型识别与访问单元 (Access Unit) 组装 ([`parsers::h265`])
//!
//! 视频数据只做重新分组, 不做任何重编码.

pub mod codec_id;
pub mod decoders;
pub mod packet;
pub mod parsers;

// 重导出常用类型
pub use codec_id::CodecId;
pub use decoders::alaw::AudioFrame;
pub use packet::Packet;
pub use parsers::h265::access_unit::{AccessUnit, AccessUnitAssembler};
