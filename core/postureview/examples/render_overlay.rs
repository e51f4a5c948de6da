//! Render a saved analysis over a before/after photo pair as SVG.
//!
//! Usage:
//!   cargo run --example render_overlay -- <analysis.json> <before> <after> [slider] [out.svg]
//!
//! The analysis file is an `AnalysisResult` as printed by the `analyze`
//! example. Output defaults to `comparison.svg`.

use anyhow::{bail, Context, Result};
use postureview::{BoxSize, Comparison, Photo, PhotoPreparer, Preset};

fn load_photo(path: &str) -> Result<(Photo, BoxSize)> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
    let prepared = PhotoPreparer::new(bytes)?.preset(Preset::Standard).prepare()?;
    let size = BoxSize::new(prepared.width as f64, prepared.height as f64);
    Ok((Photo::new(prepared.to_data_url()), size))
}

fn main() -> Result<()> {
    env_logger::init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 3 {
        bail!("usage: render_overlay <analysis.json> <before> <after> [slider] [out.svg]");
    }

    let analysis = std::fs::read_to_string(&args[0])
        .with_context(|| format!("failed to read {}", args[0]))?;
    let result = serde_json::from_str(&analysis).context("analysis file is not a valid result")?;
    let (before, size) = load_photo(&args[1])?;
    let (after, _) = load_photo(&args[2])?;

    let mut comparison = Comparison::new(result);
    if let Some(slider) = args.get(3) {
        comparison.set_slider(slider.parse().context("slider must be a number")?);
    }

    let scene = comparison.scene(Some(&before), Some(&after))?;
    let out = args.get(4).map(String::as_str).unwrap_or("comparison.svg");
    std::fs::write(out, scene.to_svg(size))?;

    let summary = comparison.result();
    println!(
        "{} view, overall {} -> {} ({:+}), slider {}% -> {out}",
        scene.view_type,
        summary.overall_before_score,
        summary.overall_after_score,
        summary.improvement(),
        comparison.slider(),
    );
    Ok(())
}
