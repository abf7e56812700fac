//! # Attribute 模块
//!
//! 单个属性动画的状态与逐帧更新规则。
//!
//! 每种属性一个变体：
//! - `Position`: 按距离推进的位移
//! - `Rotation` / `Alpha`: 按时间推进的标量插值
//! - `RotationTowards`: 朝向目标，首次生效时才解析角度，随后替换为 `Rotation`
//!
//! 完成是一次性的：`is_done()` 为真后不会再产生值。

use tracing::warn;

use crate::easing::EasingFunction;
use crate::entity::{AttributeUpdate, Location};
use crate::geometry::{Grid, Point, bearing, clamp_rotations, lerp};

/// 逐帧更新所需的实时上下文
pub struct TickContext<'a> {
    /// 被动画实体的当前旋转角度
    pub rotation: f64,
    pub grid: &'a dyn Grid,
}

/// 位移动画
#[derive(Debug, Clone, PartialEq)]
pub struct PositionAnimation {
    pub delay: f64,
    pub duration: f64,
    pub easing: EasingFunction,
    pub origin: Point,
    pub target: Point,
    /// 起点到终点的距离，创建时计算一次
    pub original_distance: f64,
    /// 已走过的距离，单调不减
    pub distance_covered: f64,
    pub progress: f64,
    pub done: bool,
}

impl PositionAnimation {
    pub fn new(
        origin: Point,
        target: Point,
        delay: f64,
        duration: f64,
        easing: EasingFunction,
    ) -> Self {
        Self {
            delay,
            duration,
            easing,
            origin,
            target,
            original_distance: origin.distance_to(target),
            distance_covered: 0.0,
            progress: 0.0,
            done: false,
        }
    }

    fn advance(&mut self, dt: f64) -> Point {
        if self.original_distance <= 0.0 || self.duration <= 0.0 {
            return self.finish();
        }

        // 步长按本帧 dt 与总时长重新计算，帧间隔不均匀时总时长仍然正确
        let step = self.original_distance / (self.duration / dt);
        self.distance_covered += step;

        if self.distance_covered >= self.original_distance {
            return self.finish();
        }

        self.progress = self.distance_covered / self.original_distance;
        self.origin.lerp(self.target, self.easing.apply(self.progress))
    }

    fn finish(&mut self) -> Point {
        self.distance_covered = self.distance_covered.max(self.original_distance);
        self.progress = 1.0;
        self.done = true;
        self.target
    }
}

/// 标量插值（旋转、透明度）
#[derive(Debug, Clone, PartialEq)]
pub struct ScalarTween {
    pub delay: f64,
    pub duration: f64,
    pub easing: EasingFunction,
    pub from: f64,
    pub to: f64,
    pub elapsed: f64,
    pub progress: f64,
    pub done: bool,
}

impl ScalarTween {
    pub fn new(from: f64, to: f64, delay: f64, duration: f64, easing: EasingFunction) -> Self {
        Self {
            delay,
            duration,
            easing,
            from,
            to,
            elapsed: 0.0,
            progress: 0.0,
            done: false,
        }
    }

    fn advance(&mut self, dt: f64) -> f64 {
        self.elapsed += dt;

        if self.duration <= 0.0 {
            self.progress = 1.0;
        } else {
            self.progress = (self.elapsed / self.duration).min(1.0);
        }

        if self.progress >= 1.0 {
            self.done = true;
            return self.to;
        }

        lerp(self.from, self.to, self.easing.apply(self.progress))
    }
}

/// 尚未解析角度的朝向动画
#[derive(Debug, Clone)]
pub struct PendingRotation {
    pub delay: f64,
    pub duration: f64,
    pub easing: EasingFunction,
    /// 方位角的起点（通常是被动画的实体）
    pub origin: Location,
    /// 要朝向的目标
    pub target: Location,
    /// 叠加在方位角上的角度（度）
    pub offset: f64,
}

impl PendingRotation {
    /// 读取实时位置，解析出具体的旋转插值
    pub fn resolve(&self, ctx: &TickContext<'_>) -> ScalarTween {
        let to = match (self.origin.anchor(), self.target.anchor()) {
            (Ok(from), Ok(to)) => bearing(from, to, ctx.grid) + self.offset,
            (Err(e), _) | (_, Err(e)) => {
                warn!(error = %e, "朝向目标的锚点无效，保持当前角度");
                ctx.rotation
            }
        };
        let (from, to) = clamp_rotations(ctx.rotation, to);
        ScalarTween::new(from, to, self.delay, self.duration, self.easing)
    }
}

/// 单个属性动画
#[derive(Debug, Clone)]
pub enum AttributeAnimation {
    Position(PositionAnimation),
    Rotation(ScalarTween),
    Alpha(ScalarTween),
    RotationTowards(PendingRotation),
}

impl AttributeAnimation {
    /// 属性名称（用于日志）
    pub fn name(&self) -> &'static str {
        match self {
            Self::Position(_) => "position",
            Self::Rotation(_) => "rotation",
            Self::Alpha(_) => "alpha",
            Self::RotationTowards(_) => "rotationTowards",
        }
    }

    pub fn delay(&self) -> f64 {
        match self {
            Self::Position(anim) => anim.delay,
            Self::Rotation(tween) | Self::Alpha(tween) => tween.delay,
            Self::RotationTowards(pending) => pending.delay,
        }
    }

    pub fn duration(&self) -> f64 {
        match self {
            Self::Position(anim) => anim.duration,
            Self::Rotation(tween) | Self::Alpha(tween) => tween.duration,
            Self::RotationTowards(pending) => pending.duration,
        }
    }

    /// 延迟与时长之和
    pub fn end_time(&self) -> f64 {
        self.delay() + self.duration()
    }

    pub fn progress(&self) -> f64 {
        match self {
            Self::Position(anim) => anim.progress,
            Self::Rotation(tween) | Self::Alpha(tween) => tween.progress,
            Self::RotationTowards(_) => 0.0,
        }
    }

    pub fn is_done(&self) -> bool {
        match self {
            Self::Position(anim) => anim.done,
            Self::Rotation(tween) | Self::Alpha(tween) => tween.done,
            Self::RotationTowards(_) => false,
        }
    }

    /// 推进一帧
    ///
    /// `dt` 为本属性在本帧内实际经过的时间（已扣除延迟）。
    /// 已完成的属性返回 `None`。
    pub fn advance(&mut self, dt: f64, ctx: &TickContext<'_>) -> Option<AttributeUpdate> {
        if let Self::RotationTowards(pending) = self {
            let resolved = pending.resolve(ctx);
            *self = Self::Rotation(resolved);
        }

        if self.is_done() {
            return None;
        }

        let update = match self {
            Self::Position(anim) => AttributeUpdate::position(anim.advance(dt)),
            Self::Rotation(tween) => AttributeUpdate {
                rotation: Some(tween.advance(dt)),
                ..AttributeUpdate::default()
            },
            Self::Alpha(tween) => AttributeUpdate {
                alpha: Some(tween.advance(dt)),
                ..AttributeUpdate::default()
            },
            Self::RotationTowards(_) => return None,
        };
        Some(update)
    }
}
