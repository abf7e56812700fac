//! # Geometry 模块
//!
//! 动画依赖的纯几何函数：
//! - `clean_position`: 提取对象的稳定锚点（方向性模板可取远端）
//! - `closest_square`: 让两个对象的包围盒边对边而不是中心对中心
//! - `clamp_rotations`: 让角度插值总是走短弧
//!
//! 格子尺寸与路径测量通过 [`Grid`] 显式传入，不读取全局状态。

use std::ops::{Add, AddAssign, Sub};

use serde::{Deserialize, Serialize};

use crate::entity::{Location, Placeable};
use crate::error::GeometryError;

/// 二维点（像素）
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub const fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }

    pub const fn zero() -> Self {
        Self { x: 0.0, y: 0.0 }
    }

    /// 两轴分别线性插值
    pub fn lerp(self, other: Self, t: f64) -> Self {
        Self {
            x: lerp(self.x, other.x, t),
            y: lerp(self.y, other.y, t),
        }
    }

    pub fn distance_to(self, other: Self) -> f64 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    /// 坐标有效时返回自身
    pub fn checked(self) -> Result<Self, GeometryError> {
        if self.is_finite() {
            Ok(self)
        } else {
            Err(GeometryError::NonFiniteAnchor {
                x: self.x,
                y: self.y,
            })
        }
    }
}

impl Add for Point {
    type Output = Point;

    fn add(self, rhs: Self) -> Self::Output {
        Point::new(self.x + rhs.x, self.y + rhs.y)
    }
}

impl AddAssign for Point {
    fn add_assign(&mut self, rhs: Self) {
        self.x += rhs.x;
        self.y += rhs.y;
    }
}

impl Sub for Point {
    type Output = Point;

    fn sub(self, rhs: Self) -> Self::Output {
        Point::new(self.x - rhs.x, self.y - rhs.y)
    }
}

impl From<(f64, f64)> for Point {
    fn from((x, y): (f64, f64)) -> Self {
        Self { x, y }
    }
}

/// 标量线性插值
pub fn lerp(from: f64, to: f64, t: f64) -> f64 {
    from + (to - from) * t
}

/// 两点之间的射线
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ray {
    pub a: Point,
    pub b: Point,
}

impl Ray {
    pub fn new(a: Point, b: Point) -> Self {
        Self { a, b }
    }

    pub fn dx(&self) -> f64 {
        self.b.x - self.a.x
    }

    pub fn dy(&self) -> f64 {
        self.b.y - self.a.y
    }

    pub fn distance(&self) -> f64 {
        self.a.distance_to(self.b)
    }

    /// 射线方向（弧度），x 轴正方向为 0，y 轴向下为正
    pub fn angle(&self) -> f64 {
        self.dy().atan2(self.dx())
    }

    /// 射线方向（度）
    pub fn angle_degrees(&self) -> f64 {
        self.angle().to_degrees()
    }
}

/// 格子与测量服务
pub trait Grid {
    /// 格子边长（像素）
    fn size(&self) -> f64;

    /// 测量两点之间的路径
    fn measure(&self, a: Point, b: Point) -> Ray {
        Ray::new(a, b)
    }
}

/// 均匀方格
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SquareGrid {
    pub size: f64,
}

impl SquareGrid {
    pub const fn new(size: f64) -> Self {
        Self { size }
    }
}

impl Grid for SquareGrid {
    fn size(&self) -> f64 {
        self.size
    }
}

/// 提取对象锚点
///
/// 普通对象返回存储的 `(x, y)`；锥形/射线模板在 `measure_far_edge` 时返回射线远端。
pub fn clean_position(
    entity: &dyn Placeable,
    measure_far_edge: bool,
) -> Result<Point, GeometryError> {
    let position = match entity.template() {
        Some(shape) if measure_far_edge && shape.kind.is_directional() => shape.far_edge,
        _ => entity.position(),
    };
    position.checked()
}

/// 计算与目标包围盒边对边的落点
///
/// 两轴独立处理。当两者在某一轴上已经重叠时，该轴不偏移，落点沿用起点坐标。
pub fn closest_square(
    origin: &Location,
    target: &Location,
    grid: &dyn Grid,
) -> Result<Point, GeometryError> {
    let origin_loc = origin.anchor()?;
    let target_loc = target.anchor()?;

    let cell = grid.size();
    let origin_size = origin.grid_size();
    let target_size = target.grid_size();

    let origin_width = origin_size.width * cell;
    let origin_height = origin_size.height * cell;
    let target_width = target_size.width * cell;
    let target_height = target_size.height * cell;

    let ray = grid.measure(origin_loc, target_loc);

    let dx = axis_offset(ray.dx(), origin_width, target_width, cell);
    let dy = axis_offset(ray.dy(), origin_height, target_height, cell);

    Ok(Point::new(origin_loc.x + dx, origin_loc.y + dy))
}

/// 单轴偏移量
fn axis_offset(d: f64, origin_extent: f64, target_extent: f64, cell: f64) -> f64 {
    let origin_trailing = (origin_extent - cell).max(cell);
    if d > 0.0 && d.abs() > origin_trailing {
        d - origin_extent
    } else if d < 0.0 && d.abs() > target_extent {
        d + target_extent
    } else {
        0.0
    }
}

/// 调整角度对，使 `from → to` 的线性插值走短弧
///
/// 返回 `(from, to)`，两者之差不超过 180°。
/// 任一角度不是有限数时原样返回。
pub fn clamp_rotations(from: f64, to: f64) -> (f64, f64) {
    if !from.is_finite() || !to.is_finite() {
        return (from, to);
    }

    let mut from = from;
    let mut to = to;
    if (from - to).abs() > 180.0 {
        if to < 0.0 {
            to += 360.0;
        } else if from > to {
            from -= 360.0;
        }
    }
    // 跨越多圈时一次折算到 ±180° 内
    if (to - from).abs() > 180.0 {
        to = from + ((to - from + 180.0).rem_euclid(360.0) - 180.0);
    }
    // 角度极大时加法的舍入可能超过半圈，此时不再旋转
    if (to - from).abs() > 180.0 {
        to = from;
    }
    (from, to)
}

/// 从 `from` 指向 `to` 的方位角（度）
pub fn bearing(from: Point, to: Point, grid: &dyn Grid) -> f64 {
    grid.measure(from, to).angle_degrees()
}
