//! 场景文件：被动画实体、具名标记与一段动画描述。

use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::rc::Rc;

use anyhow::{Context, Result, anyhow};
use serde::Deserialize;

use entity_animator::{
    AnimationRequest, FadeOptions, GridSize, Location, MoveOptions, Placeable, Point,
    RotateOptions, RotateTowardsOptions, TeleportOptions,
};

use crate::trace::TraceEntity;

/// 场景中的一个对象
#[derive(Debug, Clone, Deserialize)]
pub struct Body {
    #[serde(default)]
    pub x: f64,
    #[serde(default)]
    pub y: f64,
    #[serde(default)]
    pub rotation: f64,
    #[serde(default = "default_alpha")]
    pub alpha: f64,
    #[serde(default)]
    pub width: Option<f64>,
    #[serde(default)]
    pub height: Option<f64>,
}

fn default_alpha() -> f64 {
    1.0
}

impl Body {
    pub fn position(&self) -> Point {
        Point::new(self.x, self.y)
    }

    pub fn grid_size(&self) -> Option<GridSize> {
        match (self.width, self.height) {
            (None, None) => None,
            (w, h) => Some(GridSize::new(w.unwrap_or(1.0), h.unwrap_or(1.0))),
        }
    }
}

/// 静态标记，只用于被瞄准
#[derive(Debug)]
struct Marker(Body);

impl Placeable for Marker {
    fn position(&self) -> Point {
        self.0.position()
    }

    fn rotation(&self) -> f64 {
        self.0.rotation
    }

    fn grid_size(&self) -> Option<GridSize> {
        self.0.grid_size()
    }
}

/// 目的地：标记名或坐标
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum Target {
    Marker(String),
    Point(Point),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Aimed<T> {
    pub to: Target,
    #[serde(default)]
    pub options: T,
}

/// 动画描述
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct ScenarioAnimation {
    pub duration: Option<f64>,
    pub angle: Option<f64>,
    pub opacity: Option<f64>,
    pub offset: Option<Point>,
    pub closest_square: bool,
    pub wait_until_finished: f64,
    pub move_towards: Option<Aimed<MoveOptions>>,
    pub teleport_to: Option<Aimed<TeleportOptions>>,
    pub rotate_towards: Option<Aimed<RotateTowardsOptions>>,
    pub fade_in: Option<FadeOptions>,
    pub fade_out: Option<FadeOptions>,
    pub rotate_in: Option<RotateOptions>,
    pub rotate_out: Option<RotateOptions>,
}

/// 场景文件
#[derive(Debug, Clone, Deserialize)]
pub struct Scenario {
    pub entity: Body,
    #[serde(default)]
    pub markers: HashMap<String, Body>,
    pub animation: ScenarioAnimation,
}

impl Scenario {
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("无法读取场景文件 {}", path.display()))?;
        serde_json::from_str(&content)
            .with_context(|| format!("场景文件格式错误 {}", path.display()))
    }

    /// 构建动画请求
    pub fn build_request(
        &self,
        entity: Rc<TraceEntity>,
    ) -> Result<AnimationRequest<TraceEntity>> {
        let markers: HashMap<&str, Rc<dyn Placeable>> = self
            .markers
            .iter()
            .map(|(name, body)| (name.as_str(), Rc::new(Marker(body.clone())) as Rc<dyn Placeable>))
            .collect();

        let locate = |target: &Target| -> Result<Location> {
            match target {
                Target::Point(point) => Ok(Location::Point(*point)),
                Target::Marker(name) => markers
                    .get(name.as_str())
                    .map(|marker| Location::entity(marker.clone()))
                    .ok_or_else(|| anyhow!("未定义的标记 '{}'", name)),
            }
        };

        let animation = &self.animation;
        let mut builder = AnimationRequest::builder(entity)
            .closest_square(animation.closest_square)
            .wait_until_finished(animation.wait_until_finished);

        if let Some(duration) = animation.duration {
            builder = builder.duration(duration);
        }
        if let Some(angle) = animation.angle {
            builder = builder.angle(angle);
        }
        if let Some(opacity) = animation.opacity {
            builder = builder.opacity(opacity);
        }
        if let Some(offset) = animation.offset {
            builder = builder.offset(offset.x, offset.y);
        }
        if let Some(aimed) = &animation.move_towards {
            builder = builder.move_towards(locate(&aimed.to)?, aimed.options.clone());
        }
        if let Some(aimed) = &animation.teleport_to {
            builder = builder.teleport_to(locate(&aimed.to)?, aimed.options.clone());
        }
        if let Some(aimed) = &animation.rotate_towards {
            builder = builder.rotate_towards(locate(&aimed.to)?, aimed.options.clone());
        }
        if let Some(options) = &animation.fade_in {
            builder = builder.fade_in(options.clone());
        }
        if let Some(options) = &animation.fade_out {
            builder = builder.fade_out(options.clone());
        }
        if let Some(options) = &animation.rotate_in {
            builder = builder.rotate_in(options.clone());
        }
        if let Some(options) = &animation.rotate_out {
            builder = builder.rotate_out(options.clone());
        }

        Ok(builder.build()?)
    }
}
