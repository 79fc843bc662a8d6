#![allow(dead_code)]

#[path = "../src/angles.rs"]
mod angles;
#[path = "../src/config.rs"]
mod config;
#[path = "../src/detector.rs"]
mod detector;
#[path = "../src/extension.rs"]
mod extension;
#[path = "../src/gesture.rs"]
mod gesture;
#[path = "../src/landmarks.rs"]
mod landmarks;
#[path = "../src/model_download.rs"]
mod model_download;
#[path = "../src/pipeline/mod.rs"]
mod pipeline;
#[path = "../src/smoothing.rs"]
mod smoothing;
#[path = "../src/stats.rs"]
mod stats;
#[path = "../src/types.rs"]
mod types;

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use config::DetectorConfig;
use detector::FingerDetector;
use pipeline::recognizer::{DEFAULT_MIN_CONFIDENCE, HandposeEngine, ort::OrtEngine};
use types::{Frame, FrameReport};

fn main() -> Result<()> {
    env_logger::init();

    let mut image_paths: Vec<PathBuf> = std::env::args().skip(1).map(PathBuf::from).collect();
    if image_paths.is_empty() {
        image_paths = demo_images(Path::new("demo"))?;
    }
    if image_paths.is_empty() {
        bail!("no images given and none found under demo/");
    }

    let model_path = model_download::default_model_path();
    model_download::ensure_model_ready(&model_path, |_event| {})?;
    let mut engine = OrtEngine::new(&model_path)?;

    println!(
        "counting fingers in {} image(s) with {}",
        image_paths.len(),
        model_path.display()
    );

    for path in image_paths {
        let frame = load_frame(&path)?;
        let output = engine
            .infer(&frame)
            .with_context(|| format!("inference failed for {}", path.display()))?;
        let observation = output
            .observation(frame.width, frame.height, DEFAULT_MIN_CONFIDENCE)
            .with_context(|| format!("bad landmarks for {}", path.display()))?;

        // every image is its own scene, so no history carries over
        let mut detector = FingerDetector::new(DetectorConfig::default())?;
        match detector.process(observation.as_ref()) {
            FrameReport::Hand(hand) => println!(
                "{} -> {} fingers | {} | {} | {:.0}% | {}",
                path.display(),
                hand.raw_count,
                hand.extension.summary(),
                hand.display_text(),
                hand.confidence * 100.0,
                hand.angles.summary()
            ),
            FrameReport::NoHand { .. } => println!(
                "{} -> no hand (confidence {:.0}%)",
                path.display(),
                output.confidence * 100.0
            ),
        }
    }

    Ok(())
}

fn load_frame(path: &Path) -> Result<Frame> {
    let image = image::open(path)
        .with_context(|| format!("failed to open image {}", path.display()))?
        .to_rgba8();
    let (width, height) = image.dimensions();

    Ok(Frame {
        rgba: image.into_raw(),
        width,
        height,
        timestamp: std::time::Instant::now(),
    })
}

fn demo_images(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut images = Vec::new();
    for entry in std::fs::read_dir(dir)
        .with_context(|| format!("failed to read {}", dir.display()))?
    {
        let path = entry?.path();
        let is_image = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| {
                ["png", "jpg", "jpeg"]
                    .iter()
                    .any(|known| ext.eq_ignore_ascii_case(known))
            });
        if is_image {
            images.push(path);
        }
    }
    images.sort();
    Ok(images)
}
