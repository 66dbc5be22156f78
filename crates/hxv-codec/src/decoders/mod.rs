//! 解码器实现模块.

pub mod alaw;
