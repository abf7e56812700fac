//! # Entity Animator
//!
//! 单个实体的属性动画引擎：把位移、旋转、朝向、淡入淡出、瞬移
//! 合成为一条时间轴，并按帧推进、提交给实体。
//!
//! ## 架构概述
//!
//! 引擎不持有任何实体状态，所有读取与写入都经由宿主实现的接口：
//!
//! ```text
//! Host                                Animator
//!   │                                    │
//!   │──── AnimationRequest ────────────►│ compose()
//!   │                                    │
//!   │◄─── apply_update(AttributeUpdate) ─│ 每帧最多一次
//!   │                                    │
//!   │──── FrameDriver::next_frame() ───►│ tick()
//!   │                                    │
//!   │◄─── RunOutcome ────────────────────│
//! ```
//!
//! ## 使用示例
//!
//! ```ignore
//! let scheduler = AnimationScheduler::new(AnimatorConfig::load("animator.json")?)?;
//! let request = AnimationRequest::builder(token.clone())
//!     .move_towards(Location::point(400.0, 200.0), MoveOptions::default())
//!     .fade_out(FadeOptions::new(300.0))
//!     .build()?;
//! let mut frames = TokioFrameDriver::default();
//! let outcome = scheduler.play(&request, &mut frames).await?;
//! ```
//!
//! ## 模块结构
//!
//! - [`easing`]：缓动函数库
//! - [`geometry`]：锚点、最近格子、角度短弧
//! - [`entity`]：宿主实体接口与目的地
//! - [`request`]：动画请求与描述符
//! - [`attribute`]：单个属性的逐帧状态
//! - [`timeline`]：时间轴组装
//! - [`scheduler`]：逐帧调度与提交
//! - [`frame`]：帧驱动
//! - [`config`]：配置
//! - [`error`]：错误类型定义

pub mod attribute;
pub mod config;
pub mod easing;
pub mod entity;
pub mod error;
pub mod frame;
pub mod geometry;
pub mod request;
pub mod scheduler;
pub mod timeline;

// 重导出核心类型
pub use attribute::{AttributeAnimation, PendingRotation, PositionAnimation, ScalarTween, TickContext};
pub use config::AnimatorConfig;
pub use easing::EasingFunction;
pub use entity::{
    AnimatedEntity, AttributeUpdate, GridSize, Location, Placeable, TemplateKind, TemplateShape,
    UpdateOptions,
};
pub use error::{AnimResult, AnimationError, ConfigError, GeometryError, SinkError, ValidationError};
pub use frame::{FrameDriver, TokioFrameDriver};
pub use geometry::{Grid, Point, Ray, SquareGrid, clamp_rotations, clean_position, closest_square};
pub use request::{
    AnimationRequest, AnimationRequestBuilder, FadeOptions, MoveOptions, RotateOptions,
    RotateTowardsOptions, TeleportOptions, Translation,
};
pub use scheduler::{AnimationScheduler, Completion, RunOutcome, Tick, TimelineRunState};
pub use timeline::{Destination, PendingTeleport, Timeline, compose};
