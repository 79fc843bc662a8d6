use std::{path::Path, thread};

use anyhow::{Context, Result, anyhow};
use crossbeam_channel::{Receiver, Sender};
use ort::session::{Session, builder::GraphOptimizationLevel};
use ort::value::Tensor;

use super::{
    HandposeEngine, RecognizerBackend, WorkerCommand,
    common::{self, HandposeOutput},
    run_worker_loop,
};
use crate::{
    detector::FingerDetector,
    stats::DetectionStats,
    types::{Frame, RecognizedFrame},
};

/// Loads the session on the calling thread so a broken model fails fast,
/// then moves it onto the worker.
pub fn start_worker(
    backend: RecognizerBackend,
    detector: FingerDetector,
    frame_rx: Receiver<Frame>,
    command_rx: Receiver<WorkerCommand>,
    result_tx: Sender<RecognizedFrame>,
) -> Result<thread::JoinHandle<DetectionStats>> {
    let model_path = backend.model_path();
    let engine = OrtEngine::new(&model_path)?;
    log::info!("handpose ORT backend ready using {}", model_path.display());

    let min_confidence = backend.min_confidence();
    thread::Builder::new()
        .name("recognizer".into())
        .spawn(move || {
            run_worker_loop(
                engine,
                detector,
                min_confidence,
                frame_rx,
                command_rx,
                result_tx,
            )
        })
        .context("failed to spawn recognizer thread")
}

pub struct OrtEngine {
    session: Session,
}

impl OrtEngine {
    pub fn new(model_path: &Path) -> Result<Self> {
        let session = Session::builder()?
            .with_optimization_level(GraphOptimizationLevel::Level3)?
            .with_intra_threads(2)?
            .commit_from_file(model_path)
            .with_context(|| format!("failed to load ORT session from {}", model_path.display()))?;

        Ok(Self { session })
    }
}

impl HandposeEngine for OrtEngine {
    fn infer(&mut self, frame: &Frame) -> Result<HandposeOutput> {
        let (input, letterbox) = common::prepare_frame(frame)?;
        let tensor = Tensor::from_array(input)?;
        let outputs = self
            .session
            .run(ort::inputs![tensor])
            .context("failed to run ORT session")?;

        if outputs.len() < 1 {
            return Err(anyhow!("model returned no outputs"));
        }

        let coords = outputs[0].try_extract_array::<f32>()?;
        let flattened: Vec<f32> = coords.iter().copied().collect();
        let landmarks = common::decode_landmarks(&flattened)?;

        let scalar_output = |idx: usize| {
            if outputs.len() > idx {
                outputs[idx]
                    .try_extract_array::<f32>()
                    .ok()
                    .and_then(|arr| arr.iter().next().copied())
                    .unwrap_or(0.0)
            } else {
                0.0
            }
        };
        let confidence = scalar_output(1);
        let handedness = scalar_output(2);

        Ok(HandposeOutput {
            projected_landmarks: common::project_landmarks(&landmarks, &letterbox),
            confidence: confidence.clamp(0.0, 1.0),
            handedness,
        })
    }
}
