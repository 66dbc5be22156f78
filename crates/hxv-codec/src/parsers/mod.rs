//! 码流解析器模块.

pub mod h265;
