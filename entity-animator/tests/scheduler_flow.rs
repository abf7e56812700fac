//! # 调度流程集成测试
//!
//! 测试 AnimationRequest → Timeline → AnimationScheduler → 实体提交 的完整链路。
//! 帧时间戳由脚本给出，定时器使用 tokio 的暂停时钟，不依赖真实时间。

use std::cell::RefCell;
use std::collections::VecDeque;
use std::fmt::Write as _;
use std::rc::Rc;
use std::time::Duration;

use entity_animator::{
    AnimatedEntity, AnimationError, AnimationRequest, AnimationScheduler, AnimatorConfig,
    AttributeUpdate, Completion, FadeOptions, FrameDriver, GridSize, Location, MoveOptions,
    Placeable, Point, RotateOptions, RotateTowardsOptions, SinkError, SquareGrid, TeleportOptions,
    TokioFrameDriver, UpdateOptions,
};
use tokio::time::Instant;

/// 按脚本给出时间戳的帧驱动，脚本耗尽后永远挂起
struct ScriptedFrames {
    start: f64,
    frames: VecDeque<f64>,
}

impl ScriptedFrames {
    fn every(interval: f64, count: usize) -> Self {
        Self {
            start: 0.0,
            frames: (1..=count).map(|i| i as f64 * interval).collect(),
        }
    }

    fn none() -> Self {
        Self {
            start: 0.0,
            frames: VecDeque::new(),
        }
    }
}

impl FrameDriver for ScriptedFrames {
    fn now(&self) -> f64 {
        self.start
    }

    async fn next_frame(&mut self) -> f64 {
        match self.frames.pop_front() {
            Some(timestamp) => timestamp,
            None => std::future::pending::<f64>().await,
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct Pose {
    position: Point,
    rotation: f64,
    alpha: f64,
}

/// 记录每次提交的实体
struct RecordingEntity {
    pose: RefCell<Pose>,
    size: Option<GridSize>,
    commits: RefCell<Vec<(AttributeUpdate, UpdateOptions)>>,
    /// 第 n 次提交（从 0 开始）返回错误
    fail_at: Option<usize>,
}

impl RecordingEntity {
    fn at(x: f64, y: f64) -> Rc<Self> {
        Self::with_failure(x, y, None)
    }

    fn failing_at(x: f64, y: f64, fail_at: usize) -> Rc<Self> {
        Self::with_failure(x, y, Some(fail_at))
    }

    fn with_failure(x: f64, y: f64, fail_at: Option<usize>) -> Rc<Self> {
        Rc::new(Self {
            pose: RefCell::new(Pose {
                position: Point::new(x, y),
                rotation: 0.0,
                alpha: 1.0,
            }),
            size: None,
            commits: RefCell::new(Vec::new()),
            fail_at,
        })
    }

    fn commits(&self) -> Vec<(AttributeUpdate, UpdateOptions)> {
        self.commits.borrow().clone()
    }

    /// 每次提交一行，便于快照比对
    fn transcript(&self) -> String {
        let mut out = String::new();
        for (update, options) in self.commits.borrow().iter() {
            let mut fields = Vec::new();
            if let Some(x) = update.x {
                fields.push(format!("x={x}"));
            }
            if let Some(y) = update.y {
                fields.push(format!("y={y}"));
            }
            if let Some(rotation) = update.rotation {
                fields.push(format!("rotation={rotation}"));
            }
            if let Some(alpha) = update.alpha {
                fields.push(format!("alpha={alpha}"));
            }
            writeln!(out, "{} animate={}", fields.join(" "), options.animate).unwrap();
        }
        out.trim_end().to_string()
    }
}

impl Placeable for RecordingEntity {
    fn position(&self) -> Point {
        self.pose.borrow().position
    }

    fn rotation(&self) -> f64 {
        self.pose.borrow().rotation
    }

    fn alpha(&self) -> f64 {
        self.pose.borrow().alpha
    }

    fn grid_size(&self) -> Option<GridSize> {
        self.size
    }
}

impl AnimatedEntity for RecordingEntity {
    async fn apply_update(
        &self,
        update: &AttributeUpdate,
        options: UpdateOptions,
    ) -> Result<(), SinkError> {
        if self.fail_at == Some(self.commits.borrow().len()) {
            return Err("实体已被销毁".into());
        }

        // 模拟宿主的异步写入
        tokio::task::yield_now().await;

        let mut pose = self.pose.borrow_mut();
        if let Some(x) = update.x {
            pose.position.x = x;
        }
        if let Some(y) = update.y {
            pose.position.y = y;
        }
        if let Some(rotation) = update.rotation {
            pose.rotation = rotation;
        }
        if let Some(alpha) = update.alpha {
            pose.alpha = alpha;
        }
        self.commits.borrow_mut().push((*update, options));
        Ok(())
    }
}

fn scheduler() -> AnimationScheduler {
    AnimationScheduler::new(AnimatorConfig::default()).unwrap()
}

fn timed_move(duration: f64) -> MoveOptions {
    MoveOptions {
        duration: Some(duration),
        ..MoveOptions::default()
    }
}

/// 测试定长线性位移逐帧推进
#[tokio::test(start_paused = true)]
async fn test_linear_move_with_duration() {
    let token = RecordingEntity::at(0.0, 0.0);
    let request = AnimationRequest::builder(token.clone())
        .move_towards(Location::point(100.0, 0.0), timed_move(1000.0))
        .build()
        .unwrap();

    let mut frames = ScriptedFrames::every(250.0, 4);
    let outcome = scheduler().play(&request, &mut frames).await.unwrap();

    assert_eq!(outcome.completion, Completion::Finished);
    assert_eq!(outcome.ticks, 4);
    assert_eq!(outcome.commits, 4);
    insta::assert_snapshot!(token.transcript(), @r"
    x=25 y=0 animate=false
    x=50 y=0 animate=false
    x=75 y=0 animate=false
    x=100 y=0 animate=false
    ");
    assert_eq!(token.position(), Point::new(100.0, 0.0));
}

/// 测试未指定时长的线性位移直接提交终点
#[tokio::test(start_paused = true)]
async fn test_instant_linear_move() {
    let token = RecordingEntity::at(0.0, 0.0);
    let request = AnimationRequest::builder(token.clone())
        .move_towards(Location::point(230.0, 0.0), MoveOptions::default())
        .build()
        .unwrap();

    let mut frames = ScriptedFrames::none();
    let outcome = scheduler().play(&request, &mut frames).await.unwrap();

    // 没有逐帧属性，等待安全定时器
    assert_eq!(outcome.completion, Completion::SafetyTimer);
    assert_eq!(outcome.ticks, 0);
    assert_eq!(outcome.commits, 1);
    insta::assert_snapshot!(token.transcript(), @"x=230 y=0 animate=true");
}

/// 测试瞬移在延迟后只提交一次
#[tokio::test(start_paused = true)]
async fn test_teleport_fires_once_after_delay() {
    let token = RecordingEntity::at(0.0, 0.0);
    let request = AnimationRequest::builder(token.clone())
        .teleport_to(Location::point(40.0, 60.0), TeleportOptions { delay: 500.0 })
        .build()
        .unwrap();

    let started = Instant::now();
    let mut frames = ScriptedFrames::none();
    let outcome = scheduler().play(&request, &mut frames).await.unwrap();

    assert_eq!(outcome.completion, Completion::SafetyTimer);
    assert_eq!(outcome.commits, 1);
    assert!(started.elapsed() >= Duration::from_millis(500));
    insta::assert_snapshot!(token.transcript(), @"x=40 y=60 animate=false");
}

/// 测试瞬移目的地在触发时才读取
#[tokio::test(start_paused = true)]
async fn test_teleport_reads_live_destination() {
    let token = RecordingEntity::at(0.0, 0.0);
    let marker = RecordingEntity::at(10.0, 10.0);
    let request = AnimationRequest::builder(token.clone())
        .teleport_to(
            Location::entity(marker.clone()),
            TeleportOptions { delay: 300.0 },
        )
        .build()
        .unwrap();

    let scheduler = scheduler();
    let timeline = scheduler.compose(&request).unwrap();
    // 组装之后、触发之前移动目标
    marker.pose.borrow_mut().position = Point::new(70.0, 80.0);

    let mut frames = ScriptedFrames::none();
    scheduler.run(timeline, &mut frames).await.unwrap();
    assert_eq!(token.position(), Point::new(70.0, 80.0));
}

/// 测试瞬移目标在触发前失效时落在组装时解析的位置
#[tokio::test(start_paused = true)]
async fn test_teleport_falls_back_when_destination_breaks() {
    let token = RecordingEntity::at(0.0, 0.0);
    let marker = RecordingEntity::at(10.0, 10.0);
    let request = AnimationRequest::builder(token.clone())
        .teleport_to(
            Location::entity(marker.clone()),
            TeleportOptions { delay: 300.0 },
        )
        .fade_in(FadeOptions::new(100.0))
        .build()
        .unwrap();

    let scheduler = scheduler();
    let timeline = scheduler.compose(&request).unwrap();
    // 组装之后目标坐标变为非法值
    marker.pose.borrow_mut().position = Point::new(f64::NAN, 0.0);

    let mut frames = ScriptedFrames::every(50.0, 4);
    let outcome = scheduler.run(timeline, &mut frames).await.unwrap();

    assert_eq!(token.position(), Point::new(10.0, 10.0));
    let commits = token.commits();
    let (last, options) = commits.last().unwrap();
    assert_eq!((last.x, last.y), (Some(10.0), Some(10.0)));
    assert!(!options.animate);
    assert_eq!(outcome.commits as usize, commits.len());
}

/// 测试超大总时长不会在设定定时器时出错
#[tokio::test(start_paused = true)]
async fn test_huge_duration_still_finishes() {
    let token = RecordingEntity::at(0.0, 0.0);
    token.pose.borrow_mut().alpha = 0.0;
    let request = AnimationRequest::builder(token.clone())
        .duration(1e30)
        .fade_in(FadeOptions::new(100.0))
        .build()
        .unwrap();

    let mut frames = ScriptedFrames::every(50.0, 4);
    let outcome = scheduler().play(&request, &mut frames).await.unwrap();

    assert_eq!(outcome.completion, Completion::Finished);
    assert_eq!(token.alpha(), 1.0);
}

/// 测试空请求在安全定时器到期时结束且不提交
#[tokio::test(start_paused = true)]
async fn test_empty_request_waits_for_safety_timer() {
    let token = RecordingEntity::at(5.0, 5.0);
    let request = AnimationRequest::builder(token.clone()).build().unwrap();

    let started = Instant::now();
    let mut frames = ScriptedFrames::every(16.0, 10);
    let outcome = scheduler().play(&request, &mut frames).await.unwrap();

    assert_eq!(outcome.completion, Completion::SafetyTimer);
    assert_eq!(outcome.ticks, 0);
    assert_eq!(outcome.commits, 0);
    assert!(token.commits().is_empty());
    // 总时长 0，安全定时器只有一个帧间隔
    assert!(started.elapsed() < Duration::from_millis(20));
}

/// 测试额外等待延长安全定时器
#[tokio::test(start_paused = true)]
async fn test_wait_until_finished_extends_safety_timer() {
    let token = RecordingEntity::at(0.0, 0.0);
    let request = AnimationRequest::builder(token.clone())
        .wait_until_finished(400.0)
        .build()
        .unwrap();

    let started = Instant::now();
    let mut frames = ScriptedFrames::none();
    scheduler().play(&request, &mut frames).await.unwrap();
    assert!(started.elapsed() >= Duration::from_millis(400));
}

/// 测试提交失败终止运行
#[tokio::test(start_paused = true)]
async fn test_sink_error_terminates_run() {
    let token = RecordingEntity::failing_at(0.0, 0.0, 1);
    let request = AnimationRequest::builder(token.clone())
        .move_towards(Location::point(100.0, 0.0), timed_move(1000.0))
        .build()
        .unwrap();

    let mut frames = ScriptedFrames::every(250.0, 4);
    let result = scheduler().play(&request, &mut frames).await;

    assert!(matches!(result, Err(AnimationError::Sink(_))));
    // 停留在最后一次成功提交的位置
    assert_eq!(token.commits().len(), 1);
    assert_eq!(token.position(), Point::new(25.0, 0.0));
    // 失败之后不再消费帧
    assert_eq!(frames.frames.len(), 2);
}

/// 测试旋入走短弧
#[tokio::test(start_paused = true)]
async fn test_rotate_in_takes_short_arc() {
    let token = RecordingEntity::at(0.0, 0.0);
    let request = AnimationRequest::builder(token.clone())
        .angle(170.0)
        .rotate_in(RotateOptions::new(-170.0, 200.0))
        .build()
        .unwrap();

    let mut frames = ScriptedFrames::every(100.0, 2);
    let outcome = scheduler().play(&request, &mut frames).await.unwrap();

    assert_eq!(outcome.completion, Completion::Finished);
    insta::assert_snapshot!(token.transcript(), @r"
    rotation=180 animate=false
    rotation=190 animate=false
    ");
}

/// 测试位移与淡出在同一帧合并提交
#[tokio::test(start_paused = true)]
async fn test_move_with_back_anchored_fade_out() {
    let token = RecordingEntity::at(0.0, 0.0);
    let request = AnimationRequest::builder(token.clone())
        .move_towards(Location::point(0.0, 1000.0), timed_move(1000.0))
        .opacity(0.0)
        .fade_out(FadeOptions::new(200.0))
        .build()
        .unwrap();

    let mut frames = ScriptedFrames::every(100.0, 10);
    let outcome = scheduler().play(&request, &mut frames).await.unwrap();

    assert_eq!(outcome.completion, Completion::Finished);
    assert_eq!(outcome.commits, 10);
    insta::assert_snapshot!(token.transcript(), @r"
    x=0 y=100 animate=false
    x=0 y=200 animate=false
    x=0 y=300 animate=false
    x=0 y=400 animate=false
    x=0 y=500 animate=false
    x=0 y=600 animate=false
    x=0 y=700 animate=false
    x=0 y=800 alpha=1 animate=false
    x=0 y=900 alpha=0.5 animate=false
    x=0 y=1000 alpha=0 animate=false
    ");
}

/// 测试朝向在首次生效时读取实时角度
#[tokio::test(start_paused = true)]
async fn test_rotate_towards_target() {
    let token = RecordingEntity::at(0.0, 0.0);
    let request = AnimationRequest::builder(token.clone())
        .rotate_towards(
            Location::point(0.0, 100.0),
            RotateTowardsOptions {
                duration: 200.0,
                ..RotateTowardsOptions::default()
            },
        )
        .build()
        .unwrap();

    let mut frames = ScriptedFrames::every(100.0, 2);
    let outcome = scheduler().play(&request, &mut frames).await.unwrap();

    assert_eq!(outcome.completion, Completion::Finished);
    assert!((token.rotation() - 90.0).abs() < 1e-9);
    let rotations: Vec<f64> = token
        .commits()
        .iter()
        .filter_map(|(update, _)| update.rotation)
        .collect();
    assert_eq!(rotations.len(), 2);
    assert!((rotations[0] - 45.0).abs() < 1e-9);
}

/// 测试最近格子使用调度器的格子尺寸
#[tokio::test(start_paused = true)]
async fn test_closest_square_with_custom_grid() {
    let token = RecordingEntity::at(0.0, 0.0);
    let request = AnimationRequest::builder(token.clone())
        .move_towards(Location::point(200.0, 0.0), timed_move(100.0))
        .closest_square(true)
        .build()
        .unwrap();

    let scheduler = scheduler().with_grid(Rc::new(SquareGrid::new(50.0)));
    let mut frames = ScriptedFrames::every(100.0, 1);
    scheduler.play(&request, &mut frames).await.unwrap();

    assert_eq!(token.position(), Point::new(150.0, 0.0));
}

/// 测试组装阶段的几何错误不会产生任何提交
#[tokio::test(start_paused = true)]
async fn test_geometry_error_before_any_commit() {
    let token = RecordingEntity::at(0.0, 0.0);
    let request = AnimationRequest::builder(token.clone())
        .move_towards(Location::point(f64::INFINITY, 0.0), timed_move(100.0))
        .fade_in(FadeOptions::new(100.0))
        .build()
        .unwrap();

    let mut frames = ScriptedFrames::every(100.0, 1);
    let result = scheduler().play(&request, &mut frames).await;

    assert!(matches!(result, Err(AnimationError::Geometry(_))));
    assert!(token.commits().is_empty());
}

/// 测试真实帧驱动下的淡入
#[tokio::test(start_paused = true)]
async fn test_fade_in_with_tokio_frames() {
    let token = RecordingEntity::at(0.0, 0.0);
    token.pose.borrow_mut().alpha = 0.0;
    let request = AnimationRequest::builder(token.clone())
        .fade_in(FadeOptions::new(100.0).with_ease("easeOutQuad"))
        .build()
        .unwrap();

    let mut frames = TokioFrameDriver::default();
    let outcome = scheduler().play(&request, &mut frames).await.unwrap();

    assert_eq!(outcome.completion, Completion::Finished);
    assert_eq!(token.alpha(), 1.0);
    let alphas: Vec<f64> = token
        .commits()
        .iter()
        .filter_map(|(update, _)| update.alpha)
        .collect();
    assert!(alphas.windows(2).all(|w| w[0] <= w[1]));
    // 100ms / 16.67ms，约 6 帧完成
    assert!((6..=7).contains(&outcome.ticks));
}

/// 测试丢弃运行 future 即放弃运行
#[tokio::test(start_paused = true)]
async fn test_dropping_run_stops_commits() {
    let token = RecordingEntity::at(0.0, 0.0);
    let request = AnimationRequest::builder(token.clone())
        .fade_in(FadeOptions::new(1000.0))
        .build()
        .unwrap();

    let mut frames = TokioFrameDriver::default();
    let result = tokio::time::timeout(
        Duration::from_millis(100),
        scheduler().play(&request, &mut frames),
    )
    .await;
    assert!(result.is_err());

    let committed = token.commits().len();
    assert!(committed > 0);
    tokio::time::sleep(Duration::from_millis(500)).await;
    assert_eq!(token.commits().len(), committed);
}
