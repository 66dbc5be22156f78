//! H.265/HEVC 码流解析.
//!
//! - [`nal`]: NAL 单元类型识别, Annex B 分割, hvcC 配置构建
//! - [`access_unit`]: 将逐块到达的 NAL 单元组装为访问单元

pub mod access_unit;
pub mod nal;

pub use access_unit::{AccessUnit, AccessUnitAssembler};
pub use nal::{HevcNalUnit, HevcNalUnitType, ParameterSets, classify, nal_unit_type};
