//! Scene validation command

use anyhow::{Context, Result};
use firefly_particles::{ActivationGate, FireflyConfig, ReconstructionStrategy};

pub fn run(scene: &str) -> Result<()> {
    let config = FireflyConfig::from_file(scene)
        .with_context(|| format!("Failed to load scene '{}'", scene))?;
    config
        .validate()
        .with_context(|| format!("Scene '{}' is invalid", scene))?;

    println!("Scene: {}", scene);
    println!("  Seed: {}", config.seed);
    println!(
        "  Renderer: {} vertices per target, material '{}', shadows {:?}",
        config.renderer.max_vertices, config.renderer.settings.material, config.renderer.settings.cast_shadows
    );

    if config.effectors.is_empty() {
        let gate = match config.animation.gate {
            ActivationGate::Always => "always".to_string(),
            ActivationGate::Sweep { delay, slope } => format!("sweep (delay {delay}, slope {slope})"),
            ActivationGate::Volume { .. } => "volume".to_string(),
        };
        println!(
            "  Animation: frequency {}, amplitude {}, gate {}",
            config.animation.frequency, config.animation.amplitude, gate
        );
    } else {
        println!("  Effectors: {}", config.effectors.len());
        for effector in &config.effectors {
            println!(
                "    frequency {}, amplitude {}, at {:?}",
                effector.frequency, effector.amplitude, effector.transform.position
            );
        }
    }

    println!("  Variants:");
    for variant in &config.variants {
        println!(
            "    {:<14} weight {:<6} life {:<6} size {}",
            variant.kind.name(),
            variant.weight,
            variant.life,
            variant.size
        );
    }

    let capacity = config.renderer.max_vertices / 3;

    println!("  Spawns: {}", config.spawns.len());
    let mut warnings = 0;
    for spawn in &config.spawns {
        let variants = spawn.variants.as_deref().unwrap_or(&config.variants);
        let max_triangles_per_particle = variants
            .iter()
            .map(|v| v.kind.strategy().triangles_per_particle() as usize)
            .max()
            .unwrap_or(1);
        let triangles = spawn.shape.triangle_count().unwrap_or(0);
        println!(
            "    {:?} at frame {}: {} particle(s)",
            spawn.shape, spawn.at_frame, triangles
        );
        if let Some(settings) = &spawn.settings {
            println!("      material '{}', shadows {:?}", settings.material, settings.cast_shadows);
        }
        if let Some(variants) = &spawn.variants {
            let names: Vec<&str> = variants.iter().map(|v| v.kind.name()).collect();
            println!("      own variants: {}", names.join(", "));
        }
        if triangles * max_triangles_per_particle > capacity {
            println!(
                "      warning: may need {} triangles, capacity is {}; excess will be dropped",
                triangles * max_triangles_per_particle,
                capacity
            );
            warnings += 1;
        }
    }

    println!();
    if warnings == 0 {
        println!("Scene is valid.");
    } else {
        println!("Scene is valid with {} warning(s).", warnings);
    }
    Ok(())
}
