//! # Config 模块
//!
//! 动画器配置，集中管理帧率上限、默认移动速度与格子尺寸。
//!
//! ## 配置来源
//!
//! 1. 配置文件 (JSON)
//! 2. 默认值（文件不存在时）

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::ConfigError;

/// 动画器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimatorConfig {
    /// 帧率上限，决定最小帧间隔 `1000 / max_fps` 毫秒
    #[serde(default = "default_max_fps")]
    pub max_fps: f64,

    /// 未指定时长的位移速度（像素 / 帧）
    #[serde(default = "default_move_speed")]
    pub move_speed: f64,

    /// 默认方格的边长（像素）
    #[serde(default = "default_grid_size")]
    pub grid_size: f64,
}

fn default_max_fps() -> f64 {
    60.0
}

fn default_move_speed() -> f64 {
    23.0
}

fn default_grid_size() -> f64 {
    100.0
}

impl Default for AnimatorConfig {
    fn default() -> Self {
        Self {
            max_fps: default_max_fps(),
            move_speed: default_move_speed(),
            grid_size: default_grid_size(),
        }
    }
}

impl AnimatorConfig {
    /// 加载配置文件
    ///
    /// 文件不存在时返回默认配置并打印警告；解析失败返回错误。
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();

        if !path.exists() {
            warn!(path = ?path, "配置文件不存在，使用默认配置");
            return Ok(Self::default());
        }

        let content = fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&content)?;
        config.validate()?;
        info!(path = ?path, "配置文件加载成功");
        Ok(config)
    }

    /// 保存配置到文件
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// 验证配置有效性
    pub fn validate(&self) -> Result<(), ConfigError> {
        check_positive("max_fps", self.max_fps)?;
        check_positive("move_speed", self.move_speed)?;
        check_positive("grid_size", self.grid_size)?;
        Ok(())
    }

    /// 最小帧间隔（毫秒）
    pub fn min_frame_interval(&self) -> f64 {
        1000.0 / self.max_fps
    }
}

fn check_positive(field: &str, value: f64) -> Result<(), ConfigError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(ConfigError::Invalid(format!(
            "{} 必须是正数，实际为 {}",
            field, value
        )))
    }
}
