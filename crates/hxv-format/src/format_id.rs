//! 容器格式标识符.

use std::fmt;
use std::path::Path;

/// 容器格式标识符
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[non_exhaustive]
pub enum FormatId {
    /// HX 网络摄像机录像 (.264 / .265)
    Hx,
    /// Matroska (MKV)
    Matroska,
    /// MPEG-4 Part 14 (MP4)
    Mp4,
    /// MPEG Transport Stream (TS)
    MpegTs,
}

impl FormatId {
    /// 所有已知格式标识的列表
    pub const ALL: &[FormatId] = &[Self::Hx, Self::Matroska, Self::Mp4, Self::MpegTs];

    /// 获取格式的名称
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Hx => "hx",
            Self::Matroska => "matroska",
            Self::Mp4 => "mp4",
            Self::MpegTs => "mpegts",
        }
    }

    /// 获取格式常用的文件扩展名, 第一个为默认扩展名
    pub const fn extensions(&self) -> &'static [&'static str] {
        match self {
            Self::Hx => &["265", "264"],
            Self::Matroska => &["mkv", "mka"],
            Self::Mp4 => &["mp4", "m4v", "mov"],
            Self::MpegTs => &["ts", "m2ts", "mts"],
        }
    }

    /// 默认文件扩展名
    pub const fn default_extension(&self) -> &'static str {
        self.extensions()[0]
    }

    /// 根据文件扩展名猜测格式
    ///
    /// `ext` 不含 `.`, 大小写不敏感.
    pub fn from_extension(ext: &str) -> Option<FormatId> {
        let ext_lower = ext.to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|id| id.extensions().contains(&ext_lower.as_str()))
            .copied()
    }

    /// 根据格式名称或扩展名查找 (如 "mkv", "matroska", "ts")
    pub fn from_name(name: &str) -> Option<FormatId> {
        let lower = name.to_ascii_lowercase();
        Self::ALL
            .iter()
            .find(|id| id.name() == lower)
            .copied()
            .or_else(|| Self::from_extension(&lower))
    }

    /// 从文件路径猜测格式
    pub fn from_filename(filename: impl AsRef<Path>) -> Option<FormatId> {
        let ext = filename.as_ref().extension()?.to_str()?;
        Self::from_extension(ext)
    }
}

impl fmt::Display for FormatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_扩展名识别() {
        assert_eq!(FormatId::from_extension("MKV"), Some(FormatId::Matroska));
        assert_eq!(FormatId::from_extension("265"), Some(FormatId::Hx));
        assert_eq!(FormatId::from_extension("264"), Some(FormatId::Hx));
        assert_eq!(FormatId::from_extension("avi"), None);
        assert_eq!(FormatId::from_filename("/a/b/P241117.265"), Some(FormatId::Hx));
        assert_eq!(FormatId::from_filename("noext"), None);
    }

    #[test]
    fn test_名称识别() {
        assert_eq!(FormatId::from_name("mkv"), Some(FormatId::Matroska));
        assert_eq!(FormatId::from_name("matroska"), Some(FormatId::Matroska));
        assert_eq!(FormatId::from_name("ts"), Some(FormatId::MpegTs));
        assert_eq!(FormatId::from_name("mp4"), Some(FormatId::Mp4));
        assert_eq!(FormatId::from_name("flv"), None);
        assert_eq!(FormatId::Matroska.default_extension(), "mkv");
        assert_eq!(FormatId::MpegTs.to_string(), "mpegts");
    }
}
