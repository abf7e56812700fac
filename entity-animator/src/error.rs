//! # Error 模块
//!
//! 定义 entity-animator 中使用的错误类型。
//!
//! - 构建请求时的参数错误：[`ValidationError`]
//! - 锚点无法推导：[`GeometryError`]
//! - 配置加载/校验：[`ConfigError`]
//! - 统一错误：[`AnimationError`]

use thiserror::Error;

/// 实体更新回调返回的错误
///
/// 由宿主实现的 `AnimatedEntity::apply_update` 返回，调度器不吞掉它。
pub type SinkError = Box<dyn std::error::Error + Send + Sync>;

/// 请求参数校验错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// 数值必须非负
    #[error("{descriptor}.{field} 不能为负数，实际为 {value}")]
    NegativeValue {
        descriptor: &'static str,
        field: &'static str,
        value: f64,
    },

    /// 数值不是有限数
    #[error("{descriptor}.{field} 必须是有限数值，实际为 {value}")]
    NotFinite {
        descriptor: &'static str,
        field: &'static str,
        value: f64,
    },

    /// 数值超出范围
    #[error("{descriptor}.{field} 必须在 {min} - {max} 之间，实际为 {value}")]
    OutOfRange {
        descriptor: &'static str,
        field: &'static str,
        min: f64,
        max: f64,
        value: f64,
    },
}

impl ValidationError {
    /// 校验延迟/时长类字段：有限且非负
    pub(crate) fn check_non_negative(
        descriptor: &'static str,
        field: &'static str,
        value: f64,
    ) -> Result<(), Self> {
        if !value.is_finite() {
            return Err(Self::NotFinite {
                descriptor,
                field,
                value,
            });
        }
        if value < 0.0 {
            return Err(Self::NegativeValue {
                descriptor,
                field,
                value,
            });
        }
        Ok(())
    }

    /// 校验有限数值（角度、偏移等可以为负）
    pub(crate) fn check_finite(
        descriptor: &'static str,
        field: &'static str,
        value: f64,
    ) -> Result<(), Self> {
        if value.is_finite() {
            Ok(())
        } else {
            Err(Self::NotFinite {
                descriptor,
                field,
                value,
            })
        }
    }

    /// 校验透明度：0.0 - 1.0
    pub(crate) fn check_opacity(
        descriptor: &'static str,
        field: &'static str,
        value: f64,
    ) -> Result<(), Self> {
        Self::check_finite(descriptor, field, value)?;
        if !(0.0..=1.0).contains(&value) {
            return Err(Self::OutOfRange {
                descriptor,
                field,
                min: 0.0,
                max: 1.0,
                value,
            });
        }
        Ok(())
    }
}

/// 几何错误
#[derive(Error, Debug, Clone, PartialEq)]
pub enum GeometryError {
    /// 锚点坐标不是有限数
    #[error("无法从目标推导锚点：({x}, {y}) 不是有效坐标")]
    NonFiniteAnchor { x: f64, y: f64 },
}

/// 配置错误
#[derive(Error, Debug)]
pub enum ConfigError {
    /// IO 错误
    #[error("配置 IO 错误: {0}")]
    Io(#[from] std::io::Error),

    /// 解析/序列化失败
    #[error("配置解析失败: {0}")]
    Parse(#[from] serde_json::Error),

    /// 验证失败
    #[error("配置验证失败: {0}")]
    Invalid(String),
}

/// entity-animator 统一错误类型
#[derive(Error, Debug)]
pub enum AnimationError {
    /// 请求参数错误
    #[error("请求参数错误: {0}")]
    Validation(#[from] ValidationError),

    /// 未注册的缓动函数
    #[error("未知的缓动函数 '{name}'")]
    UnknownEasing { name: String },

    /// 几何错误
    #[error("几何错误: {0}")]
    Geometry(#[from] GeometryError),

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(#[from] ConfigError),

    /// 实体更新失败
    #[error("实体更新失败: {0}")]
    Sink(#[source] SinkError),
}

/// Result 类型别名
pub type AnimResult<T> = Result<T, AnimationError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_non_negative() {
        assert!(ValidationError::check_non_negative("fadeIn", "delay", 0.0).is_ok());
        assert_eq!(
            ValidationError::check_non_negative("fadeIn", "delay", -1.0),
            Err(ValidationError::NegativeValue {
                descriptor: "fadeIn",
                field: "delay",
                value: -1.0,
            })
        );
        assert!(matches!(
            ValidationError::check_non_negative("fadeIn", "delay", f64::NAN),
            Err(ValidationError::NotFinite { .. })
        ));
    }

    #[test]
    fn test_check_opacity() {
        assert!(ValidationError::check_opacity("request", "opacity", 0.5).is_ok());
        assert!(matches!(
            ValidationError::check_opacity("request", "opacity", 1.5),
            Err(ValidationError::OutOfRange { .. })
        ));
    }

    #[test]
    fn test_error_message() {
        let err = AnimationError::UnknownEasing {
            name: "wobble".to_string(),
        };
        assert_eq!(err.to_string(), "未知的缓动函数 'wobble'");
    }
}
