//! Example: benchmark the texture and direct strategies headlessly.
//!
//! Runs the software backend, then the GPU backend when an adapter is
//! available, and prints each comparison report as JSON.
//!
//! Run with:
//!     cargo run --release --example compare_strategies [settings.json]

use anyhow::Context;
use scrollwave::benchmark::{BenchmarkConfig, BenchmarkHarness};
use scrollwave::{CpuBackend, GpuBackend, RenderSettings, ViewportSize};
use std::time::Duration;

fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let settings = match std::env::args().nth(1) {
        Some(path) => RenderSettings::load(&path).with_context(|| format!("loading {path}"))?,
        None => RenderSettings::default(),
    };

    let config = BenchmarkConfig {
        warmup: Duration::from_secs(1),
        measurement: Duration::from_secs(5),
        viewport: ViewportSize::new(1280, 160),
        zoom_level: settings.zoom_level,
        pacing_hz: Some(settings.target_refresh_rate_hz),
        ..BenchmarkConfig::default()
    };
    let harness = BenchmarkHarness::new(config);

    println!("Scrollwave - Strategy Comparison");
    println!("================================\n");

    let cpu = harness
        .run(|| Ok(CpuBackend::new()))
        .context("software benchmark failed")?;
    println!("{}\n", cpu.to_json()?);

    match GpuBackend::new_blocking() {
        Ok(first) => {
            println!("  GPU: {}\n", first.context().adapter_info().name);
            let mut first = Some(first);
            let gpu = harness
                .run(|| match first.take() {
                    Some(backend) => Ok(backend),
                    None => Ok(GpuBackend::new_blocking()?),
                })
                .context("GPU benchmark failed")?;
            println!("{}", gpu.to_json()?);
            println!("\nRecommendation: {}", gpu.recommendation.summary);
        }
        Err(e) => {
            log::warn!("No GPU available ({e}), software results only");
            println!("Recommendation: {}", cpu.recommendation.summary);
        }
    }

    Ok(())
}
