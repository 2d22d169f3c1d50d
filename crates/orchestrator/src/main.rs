//! `lava-sim`: run a lava simulation configuration to completion.

use anyhow::{bail, Context};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use lava_orchestrator::create_simulation;

fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lava_orchestrator=info,lava_kernel=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let mut args = std::env::args().skip(1);
    let Some(config_path) = args.next() else {
        bail!("usage: lava-sim <config.json>");
    };

    let runner = create_simulation(&config_path)
        .with_context(|| format!("failed to set up simulation from {config_path}"))?;
    runner.start();
    let particles = runner.join().context("simulation did not complete")?;

    let oldest = particles.lifetime.iter().copied().fold(0.0_f32, f32::max);
    tracing::info!(
        "Run complete: {} particles ({} fluid), {:.3}s simulated",
        particles.len(),
        particles.fluid_count(),
        oldest
    );
    Ok(())
}
