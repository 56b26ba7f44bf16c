use anyhow::Context;
use clap::Parser;
use image::DynamicImage;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use component_identifier::{Args, Classification, ClassificationPipeline, ClassifierError};

fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let default_level = if args.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .init();

    let config = args.resolve_config().context("invalid configuration")?;
    let pipeline = ClassificationPipeline::from_config(&config)
        .with_context(|| format!("cannot load assets from {}", config.assets_dir.display()))?;

    let mut images: Vec<(usize, DynamicImage)> = Vec::with_capacity(args.source.len());
    for (i, path) in args.source.iter().enumerate() {
        match image::open(path) {
            Ok(img) => images.push((i, img)),
            Err(e) => report_error(path, &ClassifierError::InvalidInput(e.to_string())),
        }
    }

    let (indices, decoded): (Vec<usize>, Vec<DynamicImage>) = images.into_iter().unzip();
    for (i, outcome) in indices.into_iter().zip(pipeline.classify_batch(&decoded)) {
        let path = &args.source[i];
        match outcome {
            Ok(classification) if args.json => {
                let line = serde_json::json!({ "source": path, "classification": classification });
                println!("{line}");
            }
            Ok(classification) => print_classification(path, &classification),
            Err(e) => report_error(path, &e),
        }
    }

    Ok(())
}

fn report_error(path: &std::path::Path, e: &ClassifierError) {
    warn!(source = %path.display(), "skipping image: {e}");
    eprintln!("{}: {e}", path.display());
}

fn print_classification(path: &std::path::Path, classification: &Classification) {
    let result = &classification.result;
    let metadata = &classification.metadata;
    println!("{}", path.display());
    println!("  Component:  {}", result.label);
    println!("  Confidence: {:.1}%", result.confidence * 100.0);
    println!("  {}", metadata.description);
    if !metadata.specs.is_empty() {
        println!("  Specs:");
        for spec in &metadata.specs {
            println!("    - {spec}");
        }
    }
    if !metadata.common_projects.is_empty() {
        println!("  Common projects:");
        for project in &metadata.common_projects {
            println!("    - {project}");
        }
    }
    for fault in &classification.faults {
        println!("  (degraded: {fault})");
    }
}
