//! 把每次提交打印为一行 JSON 的实体。

use std::cell::RefCell;
use std::io::{self, Write};

use serde::Serialize;
use tokio::time::Instant;

use entity_animator::{
    AnimatedEntity, AttributeUpdate, GridSize, Placeable, Point, SinkError, UpdateOptions,
};

use crate::scenario::Body;

#[derive(Serialize)]
struct CommitLine<'a> {
    /// 距运行开始的毫秒数
    t: f64,
    animate: bool,
    #[serde(flatten)]
    update: &'a AttributeUpdate,
}

#[derive(Debug, Clone, Copy)]
struct Pose {
    position: Point,
    rotation: f64,
    alpha: f64,
}

/// 内存中的实体，提交时更新自身并打印
#[derive(Debug)]
pub struct TraceEntity {
    pose: RefCell<Pose>,
    size: Option<GridSize>,
    started: Instant,
}

impl TraceEntity {
    pub fn new(body: &Body) -> Self {
        Self {
            pose: RefCell::new(Pose {
                position: body.position(),
                rotation: body.rotation,
                alpha: body.alpha,
            }),
            size: body.grid_size(),
            started: Instant::now(),
        }
    }
}

impl Placeable for TraceEntity {
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

impl AnimatedEntity for TraceEntity {
    async fn apply_update(
        &self,
        update: &AttributeUpdate,
        options: UpdateOptions,
    ) -> Result<(), SinkError> {
        {
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
        }

        let line = CommitLine {
            t: self.started.elapsed().as_secs_f64() * 1000.0,
            animate: options.animate,
            update,
        };
        let json = serde_json::to_string(&line)?;
        let mut stdout = io::stdout().lock();
        writeln!(stdout, "{}", json)?;
        Ok(())
    }
}
