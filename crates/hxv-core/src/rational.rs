//! 有理数类型, 用于时间基 (time_base).
//!
//! HX 录像的时间戳以毫秒为单位, 默认时间基为 1/1000.

use std::fmt;

/// 有理数, 由分子和分母组成
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    /// 分子
    pub num: i32,
    /// 分母
    pub den: i32,
}

impl Rational {
    /// 创建新的有理数
    ///
    /// # 参数
    /// - `num`: 分子
    /// - `den`: 分母 (不应为 0)
    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    /// 未定义 (分母为 0)
    pub const UNDEFINED: Self = Self { num: 0, den: 0 };

    /// 常用时间基: 毫秒 (1/1_000)
    pub const MILLI: Self = Self { num: 1, den: 1_000 };

    /// 常用时间基: 纳秒 (1/1_000_000_000)
    pub const NANO: Self = Self {
        num: 1,
        den: 1_000_000_000,
    };

    /// 判断是否有效 (分母不为 0)
    pub const fn is_valid(&self) -> bool {
        self.den != 0
    }

    /// 转换为 f64 浮点数
    ///
    /// 如果分母为 0, 返回 `f64::NAN`.
    pub fn to_f64(self) -> f64 {
        if self.den == 0 {
            return f64::NAN;
        }
        f64::from(self.num) / f64::from(self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self { num, den }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_毫秒时间基() {
        assert!(Rational::MILLI.is_valid());
        assert!((Rational::MILLI.to_f64() - 0.001).abs() < f64::EPSILON);
        assert_eq!(Rational::MILLI.to_string(), "1/1000");
    }

    #[test]
    fn test_未定义时间基() {
        assert!(!Rational::UNDEFINED.is_valid());
        assert!(Rational::UNDEFINED.to_f64().is_nan());
    }
}
