//! # Easing 模块
//!
//! 缓动函数库，将归一化时间映射为缓动后的进度。
//!
//! 所有曲线满足 `f(0) = 0`、`f(1) = 1`，名称采用 camelCase（如 `easeInOutSine`），
//! 未指定时使用 `linear`。

use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

use crate::error::AnimationError;

/// 缓动函数类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum EasingFunction {
    /// 线性（匀速）
    #[default]
    Linear,
    EaseInSine,
    EaseOutSine,
    EaseInOutSine,
    EaseInQuad,
    EaseOutQuad,
    EaseInOutQuad,
    EaseInCubic,
    EaseOutCubic,
    EaseInOutCubic,
    EaseInQuart,
    EaseOutQuart,
    EaseInOutQuart,
    EaseInQuint,
    EaseOutQuint,
    EaseInOutQuint,
    EaseInExpo,
    EaseOutExpo,
    EaseInOutExpo,
    EaseInCirc,
    EaseOutCirc,
    EaseInOutCirc,
    /// 回拉缓入（起步先反向）
    EaseInBack,
    EaseOutBack,
    EaseInOutBack,
    /// 弹性
    EaseInElastic,
    EaseOutElastic,
    EaseInOutElastic,
    /// 弹跳
    EaseInBounce,
    EaseOutBounce,
    EaseInOutBounce,
}

impl EasingFunction {
    /// 所有已注册的缓动函数
    pub const ALL: [EasingFunction; 31] = [
        Self::Linear,
        Self::EaseInSine,
        Self::EaseOutSine,
        Self::EaseInOutSine,
        Self::EaseInQuad,
        Self::EaseOutQuad,
        Self::EaseInOutQuad,
        Self::EaseInCubic,
        Self::EaseOutCubic,
        Self::EaseInOutCubic,
        Self::EaseInQuart,
        Self::EaseOutQuart,
        Self::EaseInOutQuart,
        Self::EaseInQuint,
        Self::EaseOutQuint,
        Self::EaseInOutQuint,
        Self::EaseInExpo,
        Self::EaseOutExpo,
        Self::EaseInOutExpo,
        Self::EaseInCirc,
        Self::EaseOutCirc,
        Self::EaseInOutCirc,
        Self::EaseInBack,
        Self::EaseOutBack,
        Self::EaseInOutBack,
        Self::EaseInElastic,
        Self::EaseOutElastic,
        Self::EaseInOutElastic,
        Self::EaseInBounce,
        Self::EaseOutBounce,
        Self::EaseInOutBounce,
    ];

    /// 按名称查找缓动函数
    pub fn resolve(name: &str) -> Result<Self, AnimationError> {
        name.parse()
    }

    /// 缓动函数名称
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::EaseInSine => "easeInSine",
            Self::EaseOutSine => "easeOutSine",
            Self::EaseInOutSine => "easeInOutSine",
            Self::EaseInQuad => "easeInQuad",
            Self::EaseOutQuad => "easeOutQuad",
            Self::EaseInOutQuad => "easeInOutQuad",
            Self::EaseInCubic => "easeInCubic",
            Self::EaseOutCubic => "easeOutCubic",
            Self::EaseInOutCubic => "easeInOutCubic",
            Self::EaseInQuart => "easeInQuart",
            Self::EaseOutQuart => "easeOutQuart",
            Self::EaseInOutQuart => "easeInOutQuart",
            Self::EaseInQuint => "easeInQuint",
            Self::EaseOutQuint => "easeOutQuint",
            Self::EaseInOutQuint => "easeInOutQuint",
            Self::EaseInExpo => "easeInExpo",
            Self::EaseOutExpo => "easeOutExpo",
            Self::EaseInOutExpo => "easeInOutExpo",
            Self::EaseInCirc => "easeInCirc",
            Self::EaseOutCirc => "easeOutCirc",
            Self::EaseInOutCirc => "easeInOutCirc",
            Self::EaseInBack => "easeInBack",
            Self::EaseOutBack => "easeOutBack",
            Self::EaseInOutBack => "easeInOutBack",
            Self::EaseInElastic => "easeInElastic",
            Self::EaseOutElastic => "easeOutElastic",
            Self::EaseInOutElastic => "easeInOutElastic",
            Self::EaseInBounce => "easeInBounce",
            Self::EaseOutBounce => "easeOutBounce",
            Self::EaseInOutBounce => "easeInOutBounce",
        }
    }

    /// 是否为线性缓动
    pub fn is_linear(&self) -> bool {
        *self == Self::Linear
    }

    /// 计算缓动值
    ///
    /// # 参数
    /// - `t`: 时间进度 (0.0 - 1.0)，超出范围会被限制
    ///
    /// # 返回
    /// - 缓动后的进度值，端点精确为 0.0 与 1.0
    pub fn apply(&self, t: f64) -> f64 {
        if t <= 0.0 || t.is_nan() {
            return 0.0;
        }
        if t >= 1.0 {
            return 1.0;
        }

        match self {
            Self::Linear => t,
            Self::EaseInSine => 1.0 - (t * PI / 2.0).cos(),
            Self::EaseOutSine => (t * PI / 2.0).sin(),
            Self::EaseInOutSine => -((PI * t).cos() - 1.0) / 2.0,
            Self::EaseInQuad => t * t,
            Self::EaseOutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::EaseInOutQuad => in_out_power(t, 2),
            Self::EaseInCubic => t.powi(3),
            Self::EaseOutCubic => 1.0 - (1.0 - t).powi(3),
            Self::EaseInOutCubic => in_out_power(t, 3),
            Self::EaseInQuart => t.powi(4),
            Self::EaseOutQuart => 1.0 - (1.0 - t).powi(4),
            Self::EaseInOutQuart => in_out_power(t, 4),
            Self::EaseInQuint => t.powi(5),
            Self::EaseOutQuint => 1.0 - (1.0 - t).powi(5),
            Self::EaseInOutQuint => in_out_power(t, 5),
            Self::EaseInExpo => 2.0_f64.powf(10.0 * t - 10.0),
            Self::EaseOutExpo => 1.0 - 2.0_f64.powf(-10.0 * t),
            Self::EaseInOutExpo => {
                if t < 0.5 {
                    2.0_f64.powf(20.0 * t - 10.0) / 2.0
                } else {
                    (2.0 - 2.0_f64.powf(-20.0 * t + 10.0)) / 2.0
                }
            }
            Self::EaseInCirc => 1.0 - (1.0 - t * t).sqrt(),
            Self::EaseOutCirc => (1.0 - (t - 1.0).powi(2)).sqrt(),
            Self::EaseInOutCirc => {
                if t < 0.5 {
                    (1.0 - (1.0 - (2.0 * t).powi(2)).sqrt()) / 2.0
                } else {
                    ((1.0 - (-2.0 * t + 2.0).powi(2)).sqrt() + 1.0) / 2.0
                }
            }
            Self::EaseInBack => ease_in_back(t),
            Self::EaseOutBack => 1.0 - ease_in_back(1.0 - t),
            Self::EaseInOutBack => ease_in_out_back(t),
            Self::EaseInElastic => ease_in_elastic(t),
            Self::EaseOutElastic => ease_out_elastic(t),
            Self::EaseInOutElastic => ease_in_out_elastic(t),
            Self::EaseInBounce => 1.0 - ease_out_bounce(1.0 - t),
            Self::EaseOutBounce => ease_out_bounce(t),
            Self::EaseInOutBounce => {
                if t < 0.5 {
                    (1.0 - ease_out_bounce(1.0 - 2.0 * t)) / 2.0
                } else {
                    (1.0 + ease_out_bounce(2.0 * t - 1.0)) / 2.0
                }
            }
        }
    }
}

impl FromStr for EasingFunction {
    type Err = AnimationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|easing| easing.name() == s)
            .ok_or_else(|| AnimationError::UnknownEasing {
                name: s.to_string(),
            })
    }
}

impl fmt::Display for EasingFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// 幂次缓入缓出
fn in_out_power(t: f64, n: i32) -> f64 {
    if t < 0.5 {
        2.0_f64.powi(n - 1) * t.powi(n)
    } else {
        1.0 - (-2.0 * t + 2.0).powi(n) / 2.0
    }
}

const BACK_C1: f64 = 1.70158;
const BACK_C2: f64 = BACK_C1 * 1.525;

fn ease_in_back(t: f64) -> f64 {
    let c3 = BACK_C1 + 1.0;
    c3 * t * t * t - BACK_C1 * t * t
}

fn ease_in_out_back(t: f64) -> f64 {
    if t < 0.5 {
        ((2.0 * t).powi(2) * ((BACK_C2 + 1.0) * 2.0 * t - BACK_C2)) / 2.0
    } else {
        ((2.0 * t - 2.0).powi(2) * ((BACK_C2 + 1.0) * (t * 2.0 - 2.0) + BACK_C2) + 2.0) / 2.0
    }
}

fn ease_in_elastic(t: f64) -> f64 {
    let c4 = (2.0 * PI) / 3.0;
    -(2.0_f64.powf(10.0 * t - 10.0)) * ((t * 10.0 - 10.75) * c4).sin()
}

/// 弹性缓出
fn ease_out_elastic(t: f64) -> f64 {
    let c4 = (2.0 * PI) / 3.0;
    2.0_f64.powf(-10.0 * t) * ((t * 10.0 - 0.75) * c4).sin() + 1.0
}

fn ease_in_out_elastic(t: f64) -> f64 {
    let c5 = (2.0 * PI) / 4.5;
    if t < 0.5 {
        -(2.0_f64.powf(20.0 * t - 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0
    } else {
        (2.0_f64.powf(-20.0 * t + 10.0) * ((20.0 * t - 11.125) * c5).sin()) / 2.0 + 1.0
    }
}

/// 弹跳缓出
fn ease_out_bounce(t: f64) -> f64 {
    let n1 = 7.5625;
    let d1 = 2.75;

    if t < 1.0 / d1 {
        n1 * t * t
    } else if t < 2.0 / d1 {
        let t = t - 1.5 / d1;
        n1 * t * t + 0.75
    } else if t < 2.5 / d1 {
        let t = t - 2.25 / d1;
        n1 * t * t + 0.9375
    } else {
        let t = t - 2.625 / d1;
        n1 * t * t + 0.984375
    }
}
