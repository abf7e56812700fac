//! # Entity 模块
//!
//! 调度器与宿主之间的协作接口。
//!
//! ## 核心概念
//!
//! - `Placeable`: 可读取位置/旋转/透明度的对象（棋子、图块、测量模板……）
//! - `AnimatedEntity`: 被动画的实体，额外提供异步的属性提交回调
//! - `Location`: 目的地，可以是坐标点，也可以是一个实时读取的对象
//! - `AttributeUpdate`: 单次提交的属性集合（一次 tick 合并为一次写入）

use std::fmt;
use std::future::Future;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::error::{GeometryError, SinkError};
use crate::geometry::{Point, clean_position};

/// 以格子为单位的尺寸
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GridSize {
    pub width: f64,
    pub height: f64,
}

impl GridSize {
    pub const fn new(width: f64, height: f64) -> Self {
        Self { width, height }
    }
}

impl Default for GridSize {
    fn default() -> Self {
        Self::new(1.0, 1.0)
    }
}

/// 测量模板形状
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TemplateKind {
    Circle,
    Cone,
    Rect,
    Ray,
}

impl TemplateKind {
    /// 是否为方向性模板（锥形、射线），只有这类模板才有"远端"
    pub fn is_directional(&self) -> bool {
        matches!(self, Self::Cone | Self::Ray)
    }
}

/// 测量模板信息
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TemplateShape {
    pub kind: TemplateKind,
    /// 方向射线的远端点
    pub far_edge: Point,
}

/// 可定位对象接口
///
/// 所有读取都是"实时"的：调度器可能在动画进行中多次读取，
/// 例如 rotate-towards 在第一次生效的 tick 才读取目标位置。
pub trait Placeable {
    /// 当前存储的位置
    fn position(&self) -> Point;

    /// 当前旋转角度（度）
    fn rotation(&self) -> f64 {
        0.0
    }

    /// 当前透明度 (0.0 - 1.0)
    fn alpha(&self) -> f64 {
        1.0
    }

    /// 占用尺寸（格子单位），`None` 表示按 1×1 处理
    fn grid_size(&self) -> Option<GridSize> {
        None
    }

    /// 若对象是测量模板，返回其形状
    fn template(&self) -> Option<TemplateShape> {
        None
    }
}

/// 提交选项
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct UpdateOptions {
    /// 是否让实体播放自身的移动过渡
    pub animate: bool,
}

impl UpdateOptions {
    pub const INSTANT: Self = Self { animate: false };
    pub const ANIMATED: Self = Self { animate: true };
}

/// 一次提交的属性集合
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AttributeUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub y: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alpha: Option<f64>,
}

impl AttributeUpdate {
    /// 只包含位置的更新
    pub fn position(point: Point) -> Self {
        Self {
            x: Some(point.x),
            y: Some(point.y),
            ..Self::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_none() && self.y.is_none() && self.rotation.is_none() && self.alpha.is_none()
    }

    /// 合并另一个更新，`other` 中已设置的字段覆盖当前值
    pub fn merge(&mut self, other: AttributeUpdate) {
        self.x = other.x.or(self.x);
        self.y = other.y.or(self.y);
        self.rotation = other.rotation.or(self.rotation);
        self.alpha = other.alpha.or(self.alpha);
    }
}

/// 被动画的实体
///
/// 宿主通过内部可变性（如 `Rc<RefCell<_>>`）实现 `apply_update`，
/// 调度器保证同一次运行中不会并发调用它。
pub trait AnimatedEntity: Placeable + 'static {
    /// 提交属性更新
    ///
    /// 返回错误会终止当前运行，实体保持在上一次成功提交的状态。
    fn apply_update(
        &self,
        update: &AttributeUpdate,
        options: UpdateOptions,
    ) -> impl Future<Output = Result<(), SinkError>>;
}

/// 动画目的地
#[derive(Clone)]
pub enum Location {
    /// 固定坐标
    Point(Point),
    /// 实时读取的对象
    Entity {
        entity: Rc<dyn Placeable>,
        /// 对锥形/射线模板取远端点
        far_edge: bool,
    },
}

impl Location {
    pub fn point(x: f64, y: f64) -> Self {
        Self::Point(Point::new(x, y))
    }

    /// 以对象的存储位置为锚点
    pub fn entity(entity: Rc<dyn Placeable>) -> Self {
        Self::Entity {
            entity,
            far_edge: false,
        }
    }

    /// 以对象的远端为锚点（仅对锥形/射线模板生效）
    pub fn far_edge_of(entity: Rc<dyn Placeable>) -> Self {
        Self::Entity {
            entity,
            far_edge: true,
        }
    }

    /// 解析锚点
    pub fn anchor(&self) -> Result<Point, GeometryError> {
        match self {
            Self::Point(point) => point.checked(),
            Self::Entity { entity, far_edge } => clean_position(entity.as_ref(), *far_edge),
        }
    }

    /// 占用尺寸，坐标点与未声明尺寸的对象都按 1×1 处理
    pub fn grid_size(&self) -> GridSize {
        match self {
            Self::Point(_) => GridSize::default(),
            Self::Entity { entity, .. } => entity.grid_size().unwrap_or_default(),
        }
    }

    /// 当前旋转角度，坐标点为 0
    pub fn rotation(&self) -> f64 {
        match self {
            Self::Point(_) => 0.0,
            Self::Entity { entity, .. } => entity.rotation(),
        }
    }
}

impl From<Point> for Location {
    fn from(point: Point) -> Self {
        Self::Point(point)
    }
}

impl fmt::Debug for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Point(point) => f.debug_tuple("Point").field(point).finish(),
            Self::Entity { entity, far_edge } => f
                .debug_struct("Entity")
                .field("position", &entity.position())
                .field("far_edge", far_edge)
                .finish(),
        }
    }
}
