//! # Frame 模块
//!
//! 帧驱动：每次等待返回一个单调递增的时间戳（毫秒）。
//!
//! 调度器每帧自己重新调用 [`FrameDriver::next_frame`]，不假设存在周期性回调。

use std::future::Future;
use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};

/// 帧驱动接口
pub trait FrameDriver {
    /// 当前时间戳（毫秒）
    fn now(&self) -> f64;

    /// 等待下一帧，返回该帧的时间戳（毫秒）
    ///
    /// 返回的 future 可能在完成前被丢弃，实现必须允许这种取消。
    fn next_frame(&mut self) -> impl Future<Output = f64>;
}

/// 基于 tokio 定时器的帧驱动
#[derive(Debug)]
pub struct TokioFrameDriver {
    start: Instant,
    interval: Interval,
}

impl TokioFrameDriver {
    /// 以指定刷新率创建，`refresh_hz` 非正时按 60 Hz 处理
    pub fn new(refresh_hz: f64) -> Self {
        let hz = if refresh_hz.is_finite() && refresh_hz > 0.0 {
            refresh_hz
        } else {
            60.0
        };
        let start = Instant::now();
        // 周期向上取整到纳秒，避免帧间隔略小于 `1000 / max_fps` 而被节流
        let period = Duration::from_nanos((1e9 / hz).ceil() as u64);
        // 首次 tick 在一个周期之后，而不是立即完成
        let mut interval = tokio::time::interval_at(start + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        Self { start, interval }
    }

    fn elapsed_ms(&self, at: Instant) -> f64 {
        at.duration_since(self.start).as_secs_f64() * 1000.0
    }
}

impl Default for TokioFrameDriver {
    fn default() -> Self {
        Self::new(60.0)
    }
}

impl FrameDriver for TokioFrameDriver {
    fn now(&self) -> f64 {
        self.elapsed_ms(Instant::now())
    }

    async fn next_frame(&mut self) -> f64 {
        let at = self.interval.tick().await;
        self.elapsed_ms(at)
    }
}
