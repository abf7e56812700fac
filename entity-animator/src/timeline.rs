//! # Timeline 模块
//!
//! 把一个 [`AnimationRequest`] 组装成逐帧驱动所需的属性集合与总时长。
//!
//! ## 组装顺序
//!
//! ```text
//! rotate-towards → fade-in → rotate-in → move → teleport → fade-out → rotate-out
//! ```
//!
//! 顺序有意义：fade-out 与 rotate-out 的延迟取 `总时长 - 自身时长`，
//! 读取的是前面各步累计出来的总时长，保证它们恰好在整个动画结束时完成。

use std::rc::Rc;

use tracing::debug;

use crate::attribute::{AttributeAnimation, PendingRotation, PositionAnimation, ScalarTween};
use crate::config::AnimatorConfig;
use crate::easing::EasingFunction;
use crate::entity::{AnimatedEntity, Location};
use crate::error::{AnimResult, GeometryError};
use crate::geometry::{Grid, Point, clamp_rotations, clean_position, closest_square};
use crate::request::{AnimationRequest, Translation};

/// 平移目的地：在需要时才读取实时位置
#[derive(Debug, Clone)]
pub struct Destination {
    pub origin: Location,
    pub to: Location,
    pub closest_square: bool,
    pub offset: Point,
}

impl Destination {
    /// 解析最终落点（含最近格子修正与偏移）
    pub fn resolve(&self, grid: &dyn Grid) -> Result<Point, GeometryError> {
        let point = if self.closest_square {
            closest_square(&self.origin, &self.to, grid)?
        } else {
            self.to.anchor()?
        };
        (point + self.offset).checked()
    }
}

/// 延迟触发一次的瞬移
#[derive(Debug, Clone)]
pub struct PendingTeleport {
    pub delay: f64,
    pub destination: Destination,
    /// 组装时解析出的落点，触发时目的地失效则使用它
    pub fallback: Point,
}

/// 组装完成的时间轴
#[derive(Debug)]
pub struct Timeline<E> {
    pub(crate) target: Rc<E>,
    pub(crate) attributes: Vec<AttributeAnimation>,
    pub(crate) instant_move: Option<Point>,
    pub(crate) teleport: Option<PendingTeleport>,
    pub(crate) overall_duration: f64,
    pub(crate) wait_until_finished: f64,
}

impl<E> Timeline<E> {
    pub fn attributes(&self) -> &[AttributeAnimation] {
        &self.attributes
    }

    /// 总时长：各属性 `延迟 + 时长` 的最大值，不小于请求指定的固定时长
    pub fn overall_duration(&self) -> f64 {
        self.overall_duration
    }

    /// 线性、未指定时长的位移会直接提交终点
    pub fn instant_move(&self) -> Option<Point> {
        self.instant_move
    }

    pub fn teleport(&self) -> Option<&PendingTeleport> {
        self.teleport.as_ref()
    }

    /// 安全定时器时长：总时长 + 额外等待 + 一个帧间隔
    pub fn safety_timeout(&self, frame_interval: f64) -> f64 {
        (self.overall_duration + self.wait_until_finished + frame_interval).max(0.0)
    }
}

/// 组装时间轴
pub fn compose<E: AnimatedEntity>(
    request: &AnimationRequest<E>,
    config: &AnimatorConfig,
    grid: &dyn Grid,
) -> AnimResult<Timeline<E>> {
    let target = request.target().clone();
    let origin = request.origin();
    let frame_interval = config.min_frame_interval();

    let mut attributes = Vec::new();
    let mut instant_move = None;
    let mut teleport = None;
    let mut overall_duration = request.duration.unwrap_or(0.0);

    // 起点必须能得到锚点，否则在任何提交之前就中止
    origin.anchor()?;

    if let Some(rotate_towards) = &request.rotate_towards {
        let options = &rotate_towards.options;
        rotate_towards.target.anchor()?;

        attributes.push(AttributeAnimation::RotationTowards(PendingRotation {
            delay: options.delay,
            duration: options.duration,
            easing: EasingFunction::resolve(&options.ease)?,
            origin: origin.clone(),
            target: rotate_towards.target.clone(),
            offset: request.angle.unwrap_or(0.0) + options.offset,
        }));
        overall_duration = overall_duration.max(options.duration + options.delay);
    }

    if let Some(fade_in) = &request.fade_in {
        let from = request.opacity.unwrap_or_else(|| target.alpha());
        attributes.push(AttributeAnimation::Alpha(ScalarTween::new(
            from,
            1.0,
            fade_in.delay,
            fade_in.duration,
            EasingFunction::resolve(&fade_in.ease)?,
        )));
        overall_duration = overall_duration.max(fade_in.duration + fade_in.delay);
    }

    if let Some(rotate_in) = &request.rotate_in {
        let from = request.angle.unwrap_or_else(|| target.rotation());
        let (from, to) = clamp_rotations(from, rotate_in.value);
        attributes.push(AttributeAnimation::Rotation(ScalarTween::new(
            from,
            to,
            rotate_in.delay,
            rotate_in.duration,
            EasingFunction::resolve(&rotate_in.ease)?,
        )));
        overall_duration = overall_duration.max(rotate_in.duration + rotate_in.delay);
    }

    match &request.translation {
        Some(Translation::Move { to, options }) => {
            let easing = EasingFunction::resolve(&options.ease)?;
            // 位移从实体自身出发，请求的起点只参与最近格子的测量
            let origin_loc = clean_position(&*target, false)?;
            let destination = Destination {
                origin: origin.clone(),
                to: to.clone(),
                closest_square: request.closest_square,
                offset: request.offset,
            };
            let target_loc = destination.resolve(grid)?;
            let distance = origin_loc.distance_to(target_loc);

            let explicit_duration = options.duration.or(request.duration);
            let duration = explicit_duration
                .unwrap_or_else(|| (distance / config.move_speed) * frame_interval);
            overall_duration = overall_duration.max(duration + options.delay);

            if explicit_duration.is_none() && easing.is_linear() {
                instant_move = Some(target_loc);
            } else {
                attributes.push(AttributeAnimation::Position(PositionAnimation::new(
                    origin_loc,
                    target_loc,
                    options.delay,
                    duration,
                    easing,
                )));
            }
        }
        Some(Translation::Teleport { to, options }) => {
            let destination = Destination {
                origin: origin.clone(),
                to: to.clone(),
                closest_square: request.closest_square,
                offset: request.offset,
            };
            let fallback = destination.resolve(grid)?;
            teleport = Some(PendingTeleport {
                delay: options.delay,
                destination,
                fallback,
            });
            overall_duration = overall_duration.max(options.delay);
        }
        None => {}
    }

    if let Some(fade_out) = &request.fade_out {
        let to = request.opacity.unwrap_or_else(|| target.alpha());
        let delay = (overall_duration - fade_out.duration).max(0.0);
        attributes.push(AttributeAnimation::Alpha(ScalarTween::new(
            1.0,
            to,
            delay,
            fade_out.duration,
            EasingFunction::resolve(&fade_out.ease)?,
        )));
        overall_duration = overall_duration.max(delay + fade_out.duration);
    }

    if let Some(rotate_out) = &request.rotate_out {
        let mut from = request.angle.unwrap_or_else(|| target.rotation());
        if let Some(rotate_in) = &request.rotate_in {
            from += rotate_in.value;
        }
        let (from, to) = clamp_rotations(from, rotate_out.value);
        let delay = (overall_duration - rotate_out.duration).max(0.0);
        attributes.push(AttributeAnimation::Rotation(ScalarTween::new(
            from,
            to,
            delay,
            rotate_out.duration,
            EasingFunction::resolve(&rotate_out.ease)?,
        )));
        overall_duration = overall_duration.max(delay + rotate_out.duration);
    }

    debug!(
        attributes = attributes.len(),
        overall_duration = overall_duration,
        instant_move = instant_move.is_some(),
        teleport = teleport.is_some(),
        "时间轴组装完成"
    );

    Ok(Timeline {
        target,
        attributes,
        instant_move,
        teleport,
        overall_duration,
        wait_until_finished: request.wait_until_finished,
    })
}
