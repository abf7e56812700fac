//! # Anim Trace
//!
//! 动画轨迹工具 - 读取 JSON 场景，运行一次动画，把每次提交打印为一行 JSON。
//!
//! ## 用法
//!
//! ```bash
//! cargo run -p anim-trace -- tools/anim-trace/scenarios/strike.json
//! cargo run -p anim-trace -- tools/anim-trace/scenarios/strike.json --config animator.json
//! cargo run -p anim-trace -- tools/anim-trace/scenarios/strike.json --verbose
//! ```

mod scenario;
mod trace;

use std::path::PathBuf;
use std::rc::Rc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{Level, info};

use entity_animator::{AnimationScheduler, AnimatorConfig, TokioFrameDriver};

use scenario::Scenario;
use trace::TraceEntity;

#[derive(Parser)]
#[command(name = "anim-trace")]
#[command(about = "动画轨迹工具 - 逐帧打印提交给实体的属性更新")]
#[command(version)]
struct Cli {
    /// 场景文件 (JSON)
    scenario: PathBuf,

    /// 动画器配置文件（不存在时使用默认配置）
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// 覆盖配置中的帧率上限
    #[arg(long)]
    max_fps: Option<f64>,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn main() {
    let cli = Cli::parse();

    tracing_subscriber::fmt()
        .with_max_level(if cli.verbose { Level::TRACE } else { Level::INFO })
        .with_writer(std::io::stderr)
        .init();

    if let Err(e) = run(&cli) {
        eprintln!("❌ 运行失败: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let mut config = match &cli.config {
        Some(path) => AnimatorConfig::load(path)?,
        None => AnimatorConfig::default(),
    };
    if let Some(max_fps) = cli.max_fps {
        config.max_fps = max_fps;
    }
    let scheduler = AnimationScheduler::new(config)?;

    let scenario = Scenario::load(&cli.scenario)?;

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .build()
        .context("无法创建 tokio 运行时")?;

    let outcome = runtime.block_on(async {
        let entity = Rc::new(TraceEntity::new(&scenario.entity));
        let request = scenario.build_request(entity)?;
        let mut frames = TokioFrameDriver::new(scheduler.config().max_fps);
        let outcome = scheduler.play(&request, &mut frames).await?;
        anyhow::Ok(outcome)
    })?;

    info!(
        completion = ?outcome.completion,
        ticks = outcome.ticks,
        commits = outcome.commits,
        "动画结束"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::Path;

    #[test]
    fn test_bundled_scenarios_build() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("scenarios");
        for entry in std::fs::read_dir(dir).unwrap() {
            let path = entry.unwrap().path();
            let scenario = Scenario::load(&path).unwrap();
            let entity = Rc::new(TraceEntity::new(&scenario.entity));
            assert!(scenario.build_request(entity).is_ok(), "{}", path.display());
        }
    }

    #[test]
    fn test_unknown_marker_is_reported() {
        let scenario: Scenario = serde_json::from_str(
            r#"{
                "entity": { "x": 0, "y": 0 },
                "animation": { "move_towards": { "to": "nobody" } }
            }"#,
        )
        .unwrap();
        let entity = Rc::new(TraceEntity::new(&scenario.entity));
        let err = scenario.build_request(entity).unwrap_err();
        assert!(err.to_string().contains("nobody"));
    }

    #[test]
    fn test_cli_parses_flags() {
        let cli = Cli::parse_from(["anim-trace", "scene.json", "--max-fps", "30", "-v"]);
        assert_eq!(cli.scenario, PathBuf::from("scene.json"));
        assert_eq!(cli.max_fps, Some(30.0));
        assert!(cli.verbose);
        assert!(cli.config.is_none());
    }
}
