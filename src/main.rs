mod angles;
mod config;
mod detector;
mod extension;
mod gesture;
mod landmarks;
mod model_download;
mod pipeline;
mod smoothing;
mod stats;
mod types;

use std::{
    io::{self, BufRead},
    path::PathBuf,
    thread,
    time::{Duration, Instant},
};

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use crossbeam_channel::{Receiver, Sender, bounded, select, unbounded};

use config::{AbsentHandPolicy, DetectorConfig, ThresholdProfile, ThumbStrategy};
use pipeline::{RecognizerBackend, WorkerCommand};
use stats::{DetectionStats, FpsCounter};
use types::RecognizedFrame;

const STATS_REPLY_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Parser, Debug)]
#[command(
    name = "finger-counter",
    version,
    about = "Counts extended fingers and names hand gestures from a webcam",
    long_about = None
)]
struct Cli {
    /// Camera index to capture from
    #[arg(long, default_value_t = 0)]
    camera: u32,

    /// Print the available cameras and exit
    #[arg(long)]
    list_cameras: bool,

    /// Hand-pose ONNX model, downloaded when missing
    #[arg(long)]
    model: Option<PathBuf>,

    /// TOML file with detector settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Threshold preset applied on top of the config file
    #[arg(long, value_enum)]
    profile: Option<ThresholdProfile>,

    /// Thumb extension threshold in degrees
    #[arg(long)]
    thumb_threshold: Option<f32>,

    /// Extension threshold for the other four fingers, in degrees
    #[arg(long)]
    finger_threshold: Option<f32>,

    /// Number of recent counts used for smoothing
    #[arg(long)]
    window: Option<usize>,

    #[arg(long, value_enum)]
    thumb_strategy: Option<ThumbStrategy>,

    /// What frames without a hand do to the smoothing history
    #[arg(long, value_enum)]
    absent: Option<AbsentHandPolicy>,

    /// Model confidence below which a frame counts as having no hand
    #[arg(long, default_value_t = pipeline::recognizer::DEFAULT_MIN_CONFIDENCE)]
    min_confidence: f32,

    /// Mirror the camera image (selfie view)
    #[arg(long)]
    mirror: bool,

    /// Stop after this many processed frames
    #[arg(long)]
    max_frames: Option<u64>,
}

impl Cli {
    /// Config file, then profile, then individual flags.
    fn detector_config(&self) -> Result<DetectorConfig> {
        let mut config = match &self.config {
            Some(path) => DetectorConfig::load(path)?,
            None => DetectorConfig::default(),
        };

        if let Some(profile) = self.profile {
            config.apply_profile(profile);
        }
        if let Some(threshold) = self.thumb_threshold {
            config.thumb_threshold = threshold;
        }
        if let Some(threshold) = self.finger_threshold {
            config.finger_threshold = threshold;
        }
        if let Some(window) = self.window {
            config.smooth_window = window;
        }
        if let Some(strategy) = self.thumb_strategy {
            config.thumb_strategy = strategy;
        }
        if let Some(policy) = self.absent {
            config.absent_hand_policy = policy;
        }

        config.validate().context("invalid detector settings")?;
        Ok(config)
    }

    fn backend(&self) -> Result<RecognizerBackend> {
        let min_confidence = config::validate_confidence(self.min_confidence)?;
        let model_path = self
            .model
            .clone()
            .unwrap_or_else(model_download::default_model_path);
        Ok(RecognizerBackend::new(model_path, min_confidence))
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum OperatorCommand {
    Reset,
    PrintStats,
    Quit,
}

impl OperatorCommand {
    fn parse(line: &str) -> Option<Self> {
        match line.trim().to_ascii_lowercase().as_str() {
            "r" | "reset" => Some(OperatorCommand::Reset),
            "s" | "stats" => Some(OperatorCommand::PrintStats),
            "q" | "quit" => Some(OperatorCommand::Quit),
            _ => None,
        }
    }
}

fn main() -> Result<()> {
    env_logger::init();

    let cli = Cli::parse();

    if cli.list_cameras {
        return list_cameras();
    }

    let config = cli.detector_config()?;
    let backend = cli.backend()?;
    log::info!("detector settings: {config:?}");

    let model_path = backend.model_path();
    model_download::ensure_model_ready(&model_path, |_event| {})
        .with_context(|| format!("handpose model unavailable at {}", model_path.display()))?;

    let stats = run(&cli, config, backend)?;
    println!("\nsession summary\n{stats}");
    Ok(())
}

#[cfg(feature = "camera-nokhwa")]
fn list_cameras() -> Result<()> {
    let cameras = pipeline::available_cameras()?;
    if cameras.is_empty() {
        println!("no cameras found");
    }
    for camera in cameras {
        println!("{camera}");
    }
    Ok(())
}

#[cfg(not(feature = "camera-nokhwa"))]
fn list_cameras() -> Result<()> {
    anyhow::bail!("built without camera support (enable the camera-nokhwa feature)")
}

#[cfg(not(feature = "camera-nokhwa"))]
fn run(_cli: &Cli, _config: DetectorConfig, _backend: RecognizerBackend) -> Result<DetectionStats> {
    anyhow::bail!("built without camera support (enable the camera-nokhwa feature)")
}

#[cfg(feature = "camera-nokhwa")]
fn run(cli: &Cli, config: DetectorConfig, backend: RecognizerBackend) -> Result<DetectionStats> {
    use detector::FingerDetector;
    use pipeline::{CameraOptions, start_camera_stream, start_recognizer};

    let (frame_tx, frame_rx) = bounded(1);
    let (result_tx, result_rx) = bounded(4);
    let (command_tx, command_rx) = unbounded();

    let detector = FingerDetector::new(config)?;
    let worker = start_recognizer(backend, detector, frame_rx, command_rx, result_tx)?;

    let camera = start_camera_stream(
        CameraOptions {
            index: cli.camera,
            mirror: cli.mirror,
        },
        frame_tx,
    )?;

    println!("commands: r = reset smoothing, s = statistics, q = quit");
    let operator_rx = spawn_operator_input()?;
    present_results(&result_rx, &operator_rx, &command_tx, cli.max_frames);

    camera.stop();
    worker
        .join()
        .map_err(|_| anyhow!("recognizer thread panicked"))
}

/// Prints a line whenever the reported text changes, until the worker stops,
/// the operator quits, or the frame limit is reached.
fn present_results(
    result_rx: &Receiver<RecognizedFrame>,
    operator_rx: &Receiver<OperatorCommand>,
    command_tx: &Sender<WorkerCommand>,
    max_frames: Option<u64>,
) {
    let never = crossbeam_channel::never::<OperatorCommand>();
    let mut operator_open = true;
    let mut fps = FpsCounter::new(Instant::now());
    let mut last_text = String::new();
    let mut frames: u64 = 0;

    loop {
        let operator = if operator_open { operator_rx } else { &never };
        select! {
            recv(result_rx) -> msg => {
                let Ok(recognized) = msg else {
                    log::warn!("recognizer stopped unexpectedly");
                    break;
                };
                if frames == 0 {
                    log::info!("receiving {}x{} frames", recognized.width, recognized.height);
                }
                let rate = fps.tick(recognized.timestamp);
                let text = recognized.report.display_text();
                if text != last_text {
                    println!("[{rate:>2} fps] {text}");
                    last_text = text;
                }

                frames += 1;
                if max_frames.is_some_and(|limit| frames >= limit) {
                    log::info!("processed {frames} frames, stopping");
                    break;
                }
            },
            recv(operator) -> msg => match msg {
                Ok(OperatorCommand::Reset) => {
                    request_reset(command_tx);
                }
                Ok(OperatorCommand::PrintStats) => print_stats(command_tx),
                Ok(OperatorCommand::Quit) => break,
                Err(_) => operator_open = false,
            },
        }
    }
}

/// Returns whether the worker accepted the reset.
fn request_reset(command_tx: &Sender<WorkerCommand>) -> bool {
    if command_tx.send(WorkerCommand::Reset).is_err() {
        log::warn!("recognizer is not running");
        return false;
    }
    println!("smoothing reset");
    true
}

fn print_stats(command_tx: &Sender<WorkerCommand>) {
    let (reply_tx, reply_rx) = bounded(1);
    if command_tx.send(WorkerCommand::Stats(reply_tx)).is_err() {
        log::warn!("recognizer is not running");
        return;
    }
    match reply_rx.recv_timeout(STATS_REPLY_TIMEOUT) {
        Ok(stats) => println!("{stats}"),
        Err(err) => log::warn!("no statistics from recognizer: {err}"),
    }
}

fn spawn_operator_input() -> Result<Receiver<OperatorCommand>> {
    let (tx, rx) = unbounded();
    thread::Builder::new()
        .name("operator-input".into())
        .spawn(move || {
            for line in io::stdin().lock().lines() {
                let Ok(line) = line else { break };
                match OperatorCommand::parse(&line) {
                    Some(command) => {
                        if tx.send(command).is_err() || command == OperatorCommand::Quit {
                            break;
                        }
                    }
                    None if line.trim().is_empty() => {}
                    None => println!("unknown command {:?} (r, s or q)", line.trim()),
                }
            }
        })
        .context("failed to spawn operator input thread")?;
    Ok(rx)
}
