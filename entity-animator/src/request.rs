//! # Request 模块
//!
//! 动画请求模型：对哪个实体、做哪些属性动画。
//!
//! 每个描述符都是字段齐全的配置结构（每个字段都有默认值），
//! 在 [`AnimationRequestBuilder::build`] 时统一校验一次。

use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::entity::{AnimatedEntity, Location};
use crate::error::ValidationError;
use crate::geometry::Point;

fn default_ease() -> String {
    "linear".to_string()
}

/// 位移描述符
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MoveOptions {
    /// 缓动函数名称
    pub ease: String,
    /// 延迟（毫秒）
    pub delay: f64,
    /// 时长（毫秒），未指定时使用请求时长或按距离推算
    pub duration: Option<f64>,
}

impl Default for MoveOptions {
    fn default() -> Self {
        Self {
            ease: default_ease(),
            delay: 0.0,
            duration: None,
        }
    }
}

impl MoveOptions {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_non_negative("move_towards", "delay", self.delay)?;
        if let Some(duration) = self.duration {
            ValidationError::check_non_negative("move_towards", "duration", duration)?;
        }
        Ok(())
    }
}

/// 瞬移描述符
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TeleportOptions {
    /// 延迟（毫秒）
    pub delay: f64,
}

impl TeleportOptions {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_non_negative("teleport_to", "delay", self.delay)
    }
}

/// 朝向描述符
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateTowardsOptions {
    pub duration: f64,
    pub ease: String,
    pub delay: f64,
    /// 在方位角上额外叠加的角度（度）
    pub offset: f64,
}

impl Default for RotateTowardsOptions {
    fn default() -> Self {
        Self {
            duration: 0.0,
            ease: default_ease(),
            delay: 0.0,
            offset: 0.0,
        }
    }
}

impl RotateTowardsOptions {
    fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_non_negative("rotate_towards", "duration", self.duration)?;
        ValidationError::check_non_negative("rotate_towards", "delay", self.delay)?;
        ValidationError::check_finite("rotate_towards", "offset", self.offset)
    }
}

/// 淡入/淡出描述符
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FadeOptions {
    pub duration: f64,
    pub ease: String,
    pub delay: f64,
}

impl Default for FadeOptions {
    fn default() -> Self {
        Self {
            duration: 0.0,
            ease: default_ease(),
            delay: 0.0,
        }
    }
}

impl FadeOptions {
    /// 指定时长的淡入淡出
    pub fn new(duration: f64) -> Self {
        Self {
            duration,
            ..Self::default()
        }
    }

    pub fn with_ease(mut self, ease: impl Into<String>) -> Self {
        self.ease = ease.into();
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    fn validate(&self, descriptor: &'static str) -> Result<(), ValidationError> {
        ValidationError::check_non_negative(descriptor, "duration", self.duration)?;
        ValidationError::check_non_negative(descriptor, "delay", self.delay)
    }
}

/// 旋入/旋出描述符
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RotateOptions {
    /// 目标角度（度）
    pub value: f64,
    pub duration: f64,
    pub ease: String,
    pub delay: f64,
}

impl Default for RotateOptions {
    fn default() -> Self {
        Self {
            value: 0.0,
            duration: 0.0,
            ease: default_ease(),
            delay: 0.0,
        }
    }
}

impl RotateOptions {
    pub fn new(value: f64, duration: f64) -> Self {
        Self {
            value,
            duration,
            ..Self::default()
        }
    }

    pub fn with_ease(mut self, ease: impl Into<String>) -> Self {
        self.ease = ease.into();
        self
    }

    pub fn with_delay(mut self, delay: f64) -> Self {
        self.delay = delay;
        self
    }

    fn validate(&self, descriptor: &'static str) -> Result<(), ValidationError> {
        ValidationError::check_finite(descriptor, "value", self.value)?;
        ValidationError::check_non_negative(descriptor, "duration", self.duration)?;
        ValidationError::check_non_negative(descriptor, "delay", self.delay)
    }
}

/// 平移方式：连续位移或延迟瞬移，二者互斥
#[derive(Debug, Clone)]
pub enum Translation {
    Move { to: Location, options: MoveOptions },
    Teleport { to: Location, options: TeleportOptions },
}

/// 朝向目标
#[derive(Debug, Clone)]
pub struct RotateTowards {
    pub target: Location,
    pub options: RotateTowardsOptions,
}

/// 已校验的动画请求
#[derive(Debug)]
pub struct AnimationRequest<E> {
    pub(crate) target: Rc<E>,
    pub(crate) origin: Option<Location>,
    pub(crate) duration: Option<f64>,
    pub(crate) angle: Option<f64>,
    pub(crate) opacity: Option<f64>,
    pub(crate) offset: Point,
    pub(crate) closest_square: bool,
    pub(crate) wait_until_finished: f64,
    pub(crate) translation: Option<Translation>,
    pub(crate) rotate_towards: Option<RotateTowards>,
    pub(crate) fade_in: Option<FadeOptions>,
    pub(crate) fade_out: Option<FadeOptions>,
    pub(crate) rotate_in: Option<RotateOptions>,
    pub(crate) rotate_out: Option<RotateOptions>,
}

impl<E: AnimatedEntity> AnimationRequest<E> {
    /// 创建请求构建器
    pub fn builder(target: Rc<E>) -> AnimationRequestBuilder<E> {
        AnimationRequestBuilder {
            request: AnimationRequest {
                target,
                origin: None,
                duration: None,
                angle: None,
                opacity: None,
                offset: Point::zero(),
                closest_square: false,
                wait_until_finished: 0.0,
                translation: None,
                rotate_towards: None,
                fade_in: None,
                fade_out: None,
                rotate_in: None,
                rotate_out: None,
            },
        }
    }

    /// 被动画的实体
    pub fn target(&self) -> &Rc<E> {
        &self.target
    }

    /// 几何计算的起点，默认是被动画的实体本身
    pub fn origin(&self) -> Location {
        self.origin
            .clone()
            .unwrap_or_else(|| Location::entity(self.target.clone()))
    }

    pub fn translation(&self) -> Option<&Translation> {
        self.translation.as_ref()
    }
}

/// 动画请求构建器
#[derive(Debug)]
pub struct AnimationRequestBuilder<E> {
    request: AnimationRequest<E>,
}

impl<E: AnimatedEntity> AnimationRequestBuilder<E> {
    /// 设置几何起点
    ///
    /// 只影响几何计算：最近格子的边对边测量与朝向的方位角。
    /// 位移始终从被动画实体自身的锚点出发，距离与推算时长也按实体位置计算。
    pub fn origin(mut self, origin: impl Into<Location>) -> Self {
        self.request.origin = Some(origin.into());
        self
    }

    /// 连续位移到目的地（会清除已设置的瞬移）
    pub fn move_towards(mut self, to: impl Into<Location>, options: MoveOptions) -> Self {
        self.request.translation = Some(Translation::Move {
            to: to.into(),
            options,
        });
        self
    }

    /// 延迟瞬移到目的地（会清除已设置的位移）
    pub fn teleport_to(mut self, to: impl Into<Location>, options: TeleportOptions) -> Self {
        self.request.translation = Some(Translation::Teleport {
            to: to.into(),
            options,
        });
        self
    }

    /// 转向目标
    pub fn rotate_towards(
        mut self,
        target: impl Into<Location>,
        options: RotateTowardsOptions,
    ) -> Self {
        self.request.rotate_towards = Some(RotateTowards {
            target: target.into(),
            options,
        });
        self
    }

    pub fn fade_in(mut self, options: FadeOptions) -> Self {
        self.request.fade_in = Some(options);
        self
    }

    pub fn fade_out(mut self, options: FadeOptions) -> Self {
        self.request.fade_out = Some(options);
        self
    }

    pub fn rotate_in(mut self, options: RotateOptions) -> Self {
        self.request.rotate_in = Some(options);
        self
    }

    pub fn rotate_out(mut self, options: RotateOptions) -> Self {
        self.request.rotate_out = Some(options);
        self
    }

    /// 目的地偏移
    pub fn offset(mut self, x: f64, y: f64) -> Self {
        self.request.offset = Point::new(x, y);
        self
    }

    /// 选择与目标不重叠的最近格子
    pub fn closest_square(mut self, enabled: bool) -> Self {
        self.request.closest_square = enabled;
        self
    }

    /// 固定总时长（毫秒）
    pub fn duration(mut self, duration: f64) -> Self {
        self.request.duration = Some(duration);
        self
    }

    /// 固定起始角度（度）
    pub fn angle(mut self, angle: f64) -> Self {
        self.request.angle = Some(angle);
        self
    }

    /// 固定透明度：淡入的起点、淡出的终点
    pub fn opacity(mut self, opacity: f64) -> Self {
        self.request.opacity = Some(opacity);
        self
    }

    /// 安全定时器的额外等待（毫秒）
    pub fn wait_until_finished(mut self, delay: f64) -> Self {
        self.request.wait_until_finished = delay;
        self
    }

    /// 校验并生成请求
    pub fn build(self) -> Result<AnimationRequest<E>, ValidationError> {
        let request = self.request;

        if let Some(duration) = request.duration {
            ValidationError::check_non_negative("animation", "duration", duration)?;
        }
        if let Some(angle) = request.angle {
            ValidationError::check_finite("animation", "angle", angle)?;
        }
        if let Some(opacity) = request.opacity {
            ValidationError::check_opacity("animation", "opacity", opacity)?;
        }
        ValidationError::check_finite("animation", "offset.x", request.offset.x)?;
        ValidationError::check_finite("animation", "offset.y", request.offset.y)?;
        ValidationError::check_non_negative(
            "animation",
            "wait_until_finished",
            request.wait_until_finished,
        )?;

        match &request.translation {
            Some(Translation::Move { options, .. }) => options.validate()?,
            Some(Translation::Teleport { options, .. }) => options.validate()?,
            None => {}
        }
        if let Some(rotate_towards) = &request.rotate_towards {
            rotate_towards.options.validate()?;
        }
        if let Some(fade_in) = &request.fade_in {
            fade_in.validate("fade_in")?;
        }
        if let Some(fade_out) = &request.fade_out {
            fade_out.validate("fade_out")?;
        }
        if let Some(rotate_in) = &request.rotate_in {
            rotate_in.validate("rotate_in")?;
        }
        if let Some(rotate_out) = &request.rotate_out {
            rotate_out.validate("rotate_out")?;
        }

        Ok(request)
    }
}
