//! # Scheduler 模块
//!
//! 逐帧推进时间轴并把合并后的属性提交给实体。
//!
//! ## 单次运行
//!
//! ```text
//! compose → (瞬时位移) → 循环 { 下一帧 | 瞬移定时器 | 安全定时器 } → RunOutcome
//! ```
//!
//! - 帧间隔小于 `1000 / max_fps` 的帧被节流，不推进任何属性
//! - 每帧最多提交一次，且在下一帧计算之前等待提交完成
//! - 安全定时器在运行开始时设定一次，到期即结束运行

use std::rc::Rc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, trace, warn};

use crate::attribute::{AttributeAnimation, TickContext};
use crate::config::AnimatorConfig;
use crate::entity::{AnimatedEntity, AttributeUpdate, UpdateOptions};
use crate::error::{AnimResult, AnimationError, ConfigError};
use crate::frame::FrameDriver;
use crate::geometry::{Grid, SquareGrid};
use crate::request::AnimationRequest;
use crate::timeline::{self, Timeline};

/// 单帧推进结果
#[derive(Debug, Clone, PartialEq)]
pub enum Tick {
    /// 距上次推进不足一个最小帧间隔
    Throttled,
    /// 已推进，附带本帧合并后的更新（没有属性产出值时为 `None`）
    Advanced(Option<AttributeUpdate>),
}

/// 运行中的时间轴状态，只属于一次运行
#[derive(Debug)]
pub struct TimelineRunState {
    attributes: Vec<AttributeAnimation>,
    overall_duration: f64,
    min_frame_interval: f64,
    last_timestamp: f64,
    total_elapsed: f64,
    had_attributes: bool,
}

impl TimelineRunState {
    pub fn new(
        attributes: Vec<AttributeAnimation>,
        overall_duration: f64,
        min_frame_interval: f64,
        start_timestamp: f64,
    ) -> Self {
        let had_attributes = !attributes.is_empty();
        Self {
            attributes,
            overall_duration,
            min_frame_interval,
            last_timestamp: start_timestamp,
            total_elapsed: 0.0,
            had_attributes,
        }
    }

    /// 以帧时间戳推进一帧
    ///
    /// 每个属性只计入延迟之后的那部分时间，保证靠后锚定的属性恰好在总时长处结束。
    pub fn tick(&mut self, timestamp: f64, ctx: &TickContext<'_>) -> Tick {
        let dt = timestamp - self.last_timestamp;
        if dt <= 0.0 || dt < self.min_frame_interval {
            return Tick::Throttled;
        }

        self.last_timestamp = timestamp;
        self.total_elapsed += dt;

        let mut merged: Option<AttributeUpdate> = None;
        for attribute in &mut self.attributes {
            if attribute.is_done() || self.total_elapsed < attribute.delay() {
                continue;
            }
            let effective_dt = dt.min(self.total_elapsed - attribute.delay());
            if let Some(update) = attribute.advance(effective_dt, ctx) {
                merged.get_or_insert_default().merge(update);
            }
        }

        self.attributes.retain(|attribute| !attribute.is_done());
        Tick::Advanced(merged.filter(|update| !update.is_empty()))
    }

    /// 至少有一个属性，且全部完成
    pub fn is_complete(&self) -> bool {
        self.had_attributes && self.attributes.is_empty()
    }

    /// 尚未完成的属性数量
    pub fn active_count(&self) -> usize {
        self.attributes.len()
    }

    pub fn attributes(&self) -> &[AttributeAnimation] {
        &self.attributes
    }

    pub fn total_elapsed(&self) -> f64 {
        self.total_elapsed
    }

    pub fn overall_duration(&self) -> f64 {
        self.overall_duration
    }
}

/// 运行的结束方式
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
    /// 所有属性都已完成
    Finished,
    /// 安全定时器到期
    SafetyTimer,
}

/// 单次运行的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOutcome {
    pub completion: Completion,
    /// 实际推进的帧数（不含被节流的帧）
    pub ticks: u32,
    /// 提交给实体的次数
    pub commits: u32,
}

/// 动画调度器
pub struct AnimationScheduler {
    config: AnimatorConfig,
    grid: Rc<dyn Grid>,
}

impl Default for AnimationScheduler {
    fn default() -> Self {
        let config = AnimatorConfig::default();
        let grid = Rc::new(SquareGrid::new(config.grid_size));
        Self { config, grid }
    }
}

impl std::fmt::Debug for AnimationScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnimationScheduler")
            .field("config", &self.config)
            .field("grid_size", &self.grid.size())
            .finish()
    }
}

impl AnimationScheduler {
    /// 使用配置创建调度器，格子为配置中的均匀方格
    pub fn new(config: AnimatorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let grid = Rc::new(SquareGrid::new(config.grid_size));
        Ok(Self { config, grid })
    }

    /// 替换格子与测量服务
    pub fn with_grid(mut self, grid: Rc<dyn Grid>) -> Self {
        self.grid = grid;
        self
    }

    pub fn config(&self) -> &AnimatorConfig {
        &self.config
    }

    /// 组装时间轴（不启动运行）
    pub fn compose<E: AnimatedEntity>(
        &self,
        request: &AnimationRequest<E>,
    ) -> AnimResult<Timeline<E>> {
        timeline::compose(request, &self.config, &*self.grid)
    }

    /// 组装并运行
    pub async fn play<E: AnimatedEntity, F: FrameDriver>(
        &self,
        request: &AnimationRequest<E>,
        frames: &mut F,
    ) -> AnimResult<RunOutcome> {
        let timeline = self.compose(request)?;
        self.run(timeline, frames).await
    }

    /// 运行一条时间轴直到完成或安全定时器到期
    ///
    /// 提交失败会立即终止运行，实体停留在上一次成功提交的状态。
    pub async fn run<E: AnimatedEntity, F: FrameDriver>(
        &self,
        timeline: Timeline<E>,
        frames: &mut F,
    ) -> AnimResult<RunOutcome> {
        let frame_interval = self.config.min_frame_interval();
        let safety_timeout = timeline.safety_timeout(frame_interval);
        let Timeline {
            target,
            attributes,
            instant_move,
            teleport,
            overall_duration,
            ..
        } = timeline;

        debug!(
            attributes = attributes.len(),
            overall_duration = overall_duration,
            safety_timeout = safety_timeout,
            "开始运行动画"
        );

        let safety_timer = sleep(millis(safety_timeout));
        tokio::pin!(safety_timer);

        let mut commits = 0u32;
        let mut ticks = 0u32;

        if let Some(point) = instant_move {
            trace!(x = point.x, y = point.y, "瞬时位移");
            commit(&*target, &AttributeUpdate::position(point), UpdateOptions::ANIMATED).await?;
            commits += 1;
        }

        let teleport_timer = sleep(millis(teleport.as_ref().map_or(0.0, |t| t.delay)));
        tokio::pin!(teleport_timer);
        let mut pending_teleport = teleport;

        let mut state =
            TimelineRunState::new(attributes, overall_duration, frame_interval, frames.now());

        let completion = loop {
            tokio::select! {
                biased;

                _ = &mut safety_timer => break Completion::SafetyTimer,

                _ = &mut teleport_timer, if pending_teleport.is_some() => {
                    if let Some(pending) = pending_teleport.take() {
                        let point = match pending.destination.resolve(&*self.grid) {
                            Ok(point) => point,
                            Err(e) => {
                                warn!(error = %e, "瞬移目的地已失效，使用组装时的落点");
                                pending.fallback
                            }
                        };
                        trace!(x = point.x, y = point.y, "瞬移");
                        commit(&*target, &AttributeUpdate::position(point), UpdateOptions::INSTANT)
                            .await?;
                        commits += 1;
                    }
                }

                timestamp = frames.next_frame(), if state.active_count() > 0 => {
                    let ctx = TickContext {
                        rotation: target.rotation(),
                        grid: &*self.grid,
                    };
                    match state.tick(timestamp, &ctx) {
                        Tick::Throttled => trace!(timestamp = timestamp, "帧被节流"),
                        Tick::Advanced(update) => {
                            ticks += 1;
                            if let Some(update) = update {
                                trace!(
                                    timestamp = timestamp,
                                    elapsed = state.total_elapsed(),
                                    update = ?update,
                                    "提交属性"
                                );
                                commit(&*target, &update, UpdateOptions::INSTANT).await?;
                                commits += 1;
                            }
                        }
                    }
                }
            }

            if state.is_complete() && pending_teleport.is_none() {
                break Completion::Finished;
            }
        };

        if completion == Completion::SafetyTimer && state.active_count() > 0 {
            warn!(
                remaining = state.active_count(),
                elapsed = state.total_elapsed(),
                "安全定时器到期，仍有属性未完成"
            );
        }

        let outcome = RunOutcome {
            completion,
            ticks,
            commits,
        };
        debug!(outcome = ?outcome, "动画运行结束");
        Ok(outcome)
    }
}

async fn commit<E: AnimatedEntity>(
    target: &E,
    update: &AttributeUpdate,
    options: UpdateOptions,
) -> AnimResult<()> {
    target
        .apply_update(update, options)
        .await
        .map_err(AnimationError::Sink)
}

/// 毫秒转 `Duration`，超出表示范围时取最大值
fn millis(ms: f64) -> Duration {
    Duration::try_from_secs_f64(ms.max(0.0) / 1000.0).unwrap_or(Duration::MAX)
}
