//! Run a live analysis of one before/after pair.
//!
//! Usage:
//!   GEMINI_API_KEY=... cargo run --example analyze --features gemini -- \
//!       <before> <after> [front|side] [config.toml]
//!
//! Prints the validated `AnalysisResult` as JSON on stdout.

use anyhow::{bail, Context, Result};
use postureview::{AnalyzerConfig, Analyzer, PhotoPreparer, ViewImages, ViewType};

fn prepare(path: &str) -> Result<postureview::DataUrl> {
    let bytes = std::fs::read(path).with_context(|| format!("failed to read {path}"))?;
    Ok(PhotoPreparer::new(bytes)?.prepare()?.into_data_url())
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    if args.len() < 2 {
        bail!("usage: analyze <before> <after> [front|side] [config.toml]");
    }

    let view_type: ViewType = match args.get(2) {
        Some(v) => v.parse().map_err(anyhow::Error::msg)?,
        None => ViewType::Side,
    };

    let mut config = match args.get(3) {
        Some(path) => AnalyzerConfig::load(path)?,
        None => AnalyzerConfig::default(),
    };
    if config.api_key.is_none() {
        config.api_key = AnalyzerConfig::from_env().api_key;
    }

    let view = ViewImages::new(view_type, prepare(&args[0])?, prepare(&args[1])?);
    let analyzer = Analyzer::gemini(config)?;
    let result = analyzer.analyze(view, None)?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    Ok(())
}
