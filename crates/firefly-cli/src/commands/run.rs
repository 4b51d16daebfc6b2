//! Headless scene run

use anyhow::{Context, Result};
use firefly_particles::{FireflyConfig, FireflySystem, SceneStats};
use firefly_runtime::FrameLoop;
use serde::Serialize;
use std::path::PathBuf;
use std::time::Instant;

pub struct RunArgs {
    pub scene: String,
    pub frames: u64,
    pub dt: f64,
    pub every: u64,
    pub report: Option<PathBuf>,
}

/// One sampled frame
#[derive(Debug, Clone, Serialize)]
struct Sample {
    frame: u64,
    time: f32,
    #[serde(flatten)]
    stats: SceneStats,
}

/// Written by `--report`
#[derive(Debug, Serialize)]
struct RunReport {
    scene: String,
    frames: u64,
    dt: f64,
    elapsed_ms: f64,
    peak: SceneStats,
    remaining: SceneStats,
    samples: Vec<Sample>,
}

pub fn run(args: RunArgs) -> Result<()> {
    let config = FireflyConfig::from_file(&args.scene)
        .with_context(|| format!("Failed to load scene '{}'", args.scene))?;
    let system = FireflySystem::new(config).context("Invalid scene configuration")?;

    let mut frames = FrameLoop::default();
    frames.add_system(Box::new(system))?;

    println!("Running '{}' for {} frame(s), dt = {:.4}s", args.scene, args.frames, args.dt);
    println!("{:>7} {:>9} {:>10} {:>8} {:>10}", "frame", "time", "particles", "targets", "triangles");

    let start = Instant::now();
    let mut peak = SceneStats::default();
    let mut samples = Vec::new();
    for _ in 0..args.frames {
        let time = frames
            .step(args.dt)
            .with_context(|| format!("Frame {} failed", frames.clock.frame_count()))?;
        let stats = SceneStats::collect(&frames.world);
        peak.particles = peak.particles.max(stats.particles);
        peak.triangles = peak.triangles.max(stats.triangles);
        peak.targets = peak.targets.max(stats.targets);

        if args.every > 0 && time.frame % args.every == 0 {
            println!(
                "{:>7} {:>8.3}s {:>10} {:>8} {:>10}",
                time.frame, time.time, stats.particles, stats.targets, stats.triangles
            );
            samples.push(Sample {
                frame: time.frame,
                time: time.time,
                stats,
            });
        }
    }
    let elapsed = start.elapsed();
    let remaining = SceneStats::collect(&frames.world);

    frames.shutdown()?;

    println!();
    println!("Simulated {} frame(s) in {:.2} ms", args.frames, elapsed.as_secs_f64() * 1000.0);
    println!(
        "  Peak: {} particle(s), {} triangle(s), {} render target(s)",
        peak.particles, peak.triangles, peak.targets
    );
    println!("  Remaining: {} particle(s)", remaining.particles);

    if let Some(path) = &args.report {
        let report = RunReport {
            scene: args.scene.clone(),
            frames: args.frames,
            dt: args.dt,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            peak,
            remaining,
            samples,
        };
        let text = toml::to_string(&report).context("Failed to serialize run report")?;
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write report '{}'", path.display()))?;
        println!("  Report: {}", path.display());
    }
    Ok(())
}
