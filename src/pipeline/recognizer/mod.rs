pub mod common;
pub mod ort;

use std::{path::PathBuf, thread};

use crossbeam_channel::{Receiver, Sender, select};

use crate::{
    detector::FingerDetector,
    model_download::default_model_path,
    stats::DetectionStats,
    types::{Frame, FrameReport, RecognizedFrame},
};

use self::common::HandposeOutput;

pub(crate) const DEFAULT_MIN_CONFIDENCE: f32 = 0.2;

/// Produces raw hand-pose output for a single frame.
pub trait HandposeEngine: Send + 'static {
    fn infer(&mut self, frame: &Frame) -> anyhow::Result<HandposeOutput>;
}

/// Requests the worker handles between frames.
#[derive(Debug)]
pub enum WorkerCommand {
    Reset,
    Stats(Sender<DetectionStats>),
}

/// Runs until the frame channel disconnects and hands back the final stats.
pub fn run_worker_loop<E: HandposeEngine>(
    mut engine: E,
    mut detector: FingerDetector,
    min_confidence: f32,
    frame_rx: Receiver<Frame>,
    command_rx: Receiver<WorkerCommand>,
    result_tx: Sender<RecognizedFrame>,
) -> DetectionStats {
    log::info!("recognizer worker started: {:?}", detector.config());
    let never = crossbeam_channel::never::<WorkerCommand>();
    let mut commands_open = true;

    loop {
        let commands = if commands_open { &command_rx } else { &never };
        let frame = select! {
            recv(frame_rx) -> msg => match msg {
                Ok(frame) => latest_of(frame, &frame_rx),
                Err(_) => break,
            },
            recv(commands) -> msg => {
                match msg {
                    Ok(command) => apply_command(command, &mut detector),
                    Err(_) => commands_open = false,
                }
                continue;
            },
        };

        let output = match engine.infer(&frame) {
            Ok(output) => output,
            Err(err) => {
                log::warn!("handpose inference failed: {err:?}");
                continue;
            }
        };

        let observation = match output.observation(frame.width, frame.height, min_confidence) {
            Ok(observation) => observation,
            Err(err) => {
                log::warn!("discarding malformed landmarks: {err}");
                continue;
            }
        };

        if let Some(hand) = &observation {
            let bbox = hand.landmarks.bounding_box(frame.width, frame.height);
            log::debug!(
                "hand box ({}, {})-({}, {}) confidence {:.2}",
                bbox.x_min,
                bbox.y_min,
                bbox.x_max,
                bbox.y_max,
                hand.confidence
            );
        }

        let report = detector.process(observation.as_ref());
        if let FrameReport::Hand(hand) = &report {
            log::debug!("angles: {}", hand.angles.summary());
        }
        let _ = result_tx.try_send(RecognizedFrame {
            width: frame.width,
            height: frame.height,
            timestamp: frame.timestamp,
            report,
        });
    }

    drain_commands(&command_rx, &mut detector);
    log::info!("recognizer worker stopped");
    detector.into_stats()
}

fn drain_commands(command_rx: &Receiver<WorkerCommand>, detector: &mut FingerDetector) {
    while let Ok(command) = command_rx.try_recv() {
        apply_command(command, detector);
    }
}

fn apply_command(command: WorkerCommand, detector: &mut FingerDetector) {
    match command {
        WorkerCommand::Reset => detector.reset(),
        WorkerCommand::Stats(reply) => {
            let _ = reply.send(detector.stats().clone());
        }
    }
}

fn latest_of(mut frame: Frame, frame_rx: &Receiver<Frame>) -> Frame {
    while let Ok(newer) = frame_rx.try_recv() {
        frame = newer;
    }
    frame
}

#[derive(Clone, Debug)]
pub struct RecognizerBackend {
    model_path: PathBuf,
    min_confidence: f32,
}

impl RecognizerBackend {
    pub fn new(model_path: PathBuf, min_confidence: f32) -> Self {
        Self {
            model_path,
            min_confidence,
        }
    }

    pub fn model_path(&self) -> PathBuf {
        self.model_path.clone()
    }

    pub fn min_confidence(&self) -> f32 {
        self.min_confidence
    }

    pub fn label(&self) -> &'static str {
        "ort"
    }
}

impl Default for RecognizerBackend {
    fn default() -> Self {
        RecognizerBackend {
            model_path: default_model_path(),
            min_confidence: DEFAULT_MIN_CONFIDENCE,
        }
    }
}

pub fn start_recognizer(
    backend: RecognizerBackend,
    detector: FingerDetector,
    frame_rx: Receiver<Frame>,
    command_rx: Receiver<WorkerCommand>,
    result_tx: Sender<RecognizedFrame>,
) -> anyhow::Result<thread::JoinHandle<DetectionStats>> {
    log::info!("starting handpose backend: {}", backend.label());

    ort::start_worker(backend, detector, frame_rx, command_rx, result_tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::DetectorConfig, types::GestureKind};
    use anyhow::anyhow;
    use crossbeam_channel::{bounded, unbounded};
    use std::time::{Duration, Instant};

    /// Replays a fixed script of outputs, one per frame.
    struct ScriptedEngine {
        outputs: Vec<anyhow::Result<HandposeOutput>>,
    }

    impl HandposeEngine for ScriptedEngine {
        fn infer(&mut self, _frame: &Frame) -> anyhow::Result<HandposeOutput> {
            if self.outputs.is_empty() {
                return Ok(no_hand());
            }
            self.outputs.remove(0)
        }
    }

    fn no_hand() -> HandposeOutput {
        HandposeOutput {
            projected_landmarks: Vec::new(),
            confidence: 0.0,
            handedness: 0.0,
        }
    }

    fn frame() -> Frame {
        Frame {
            rgba: vec![0; 100 * 100 * 4],
            width: 100,
            height: 100,
            timestamp: Instant::now(),
        }
    }

    /// Open hand in pixel space on a 100x100 frame.
    fn open_hand_output() -> HandposeOutput {
        let set = crate::landmarks::fixtures::open_hand();
        HandposeOutput {
            projected_landmarks: set
                .points()
                .iter()
                .map(|p| (p.x * 100.0, p.y * 100.0))
                .collect(),
            confidence: 0.9,
            handedness: 0.8,
        }
    }

    fn detector() -> FingerDetector {
        FingerDetector::new(DetectorConfig::default()).unwrap()
    }

    #[test]
    fn test_worker_reports_each_frame_and_returns_stats() {
        let engine = ScriptedEngine {
            outputs: vec![
                Ok(open_hand_output()),
                Ok(no_hand()),
                Err(anyhow!("backend hiccup")),
            ],
        };
        let (frame_tx, frame_rx) = unbounded();
        let (_command_tx, command_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();

        let worker = thread::spawn(move || {
            run_worker_loop(
                engine,
                detector(),
                DEFAULT_MIN_CONFIDENCE,
                frame_rx,
                command_rx,
                result_tx,
            )
        });

        // wait for each report before sending the next frame so none are coalesced
        let mut reports = Vec::new();
        for _ in 0..2 {
            frame_tx.send(frame()).unwrap();
            let recognized = result_rx.recv_timeout(Duration::from_secs(2)).unwrap();
            reports.push(recognized.report);
        }
        frame_tx.send(frame()).unwrap();
        drop(frame_tx);
        let stats = worker.join().unwrap();

        // the failed inference produces no report
        assert!(result_rx.try_recv().is_err());
        assert_eq!(reports.len(), 2);
        match &reports[0] {
            FrameReport::Hand(hand) => assert_eq!(hand.gesture, GestureKind::OpenHand),
            other => panic!("expected a hand, got {other:?}"),
        }
        assert_eq!(
            reports[1],
            FrameReport::NoHand {
                smoothed_count: Some(5)
            }
        );

        // the failed inference is not counted
        assert_eq!(stats.total_frames, 2);
        assert_eq!(stats.hands_detected, 1);
    }

    #[test]
    fn test_low_confidence_counts_as_no_hand() {
        let mut weak = open_hand_output();
        weak.confidence = 0.1;
        let engine = ScriptedEngine {
            outputs: vec![Ok(weak)],
        };
        let (frame_tx, frame_rx) = unbounded();
        let (_command_tx, command_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();

        frame_tx.send(frame()).unwrap();
        drop(frame_tx);
        let stats = run_worker_loop(
            engine,
            detector(),
            DEFAULT_MIN_CONFIDENCE,
            frame_rx,
            command_rx,
            result_tx,
        );

        assert_eq!(stats.hands_detected, 0);
        assert_eq!(
            result_rx.try_recv().unwrap().report,
            FrameReport::NoHand {
                smoothed_count: None
            }
        );
    }

    #[test]
    fn test_stats_command_replies_with_running_totals() {
        let engine = ScriptedEngine {
            outputs: vec![Ok(open_hand_output())],
        };
        let (frame_tx, frame_rx) = unbounded();
        let (command_tx, command_rx) = unbounded();
        let (result_tx, result_rx) = unbounded();

        let worker = thread::spawn(move || {
            run_worker_loop(
                engine,
                detector(),
                DEFAULT_MIN_CONFIDENCE,
                frame_rx,
                command_rx,
                result_tx,
            )
        });

        frame_tx.send(frame()).unwrap();
        result_rx.recv_timeout(Duration::from_secs(2)).unwrap();

        let (reply_tx, reply_rx) = bounded(1);
        command_tx.send(WorkerCommand::Stats(reply_tx)).unwrap();
        let snapshot = reply_rx.recv_timeout(Duration::from_secs(2)).unwrap();
        assert_eq!(snapshot.total_frames, 1);
        assert_eq!(snapshot.gesture_count(GestureKind::OpenHand), 1);

        command_tx.send(WorkerCommand::Reset).unwrap();
        drop(frame_tx);
        let stats = worker.join().unwrap();
        assert_eq!(stats, snapshot);
    }

    #[test]
    fn test_latest_of_keeps_newest_frame() {
        let (frame_tx, frame_rx) = unbounded();
        let first = frame();
        let mut last = frame();
        last.width = 7;
        frame_tx.send(frame()).unwrap();
        frame_tx.send(last).unwrap();

        let picked = latest_of(first, &frame_rx);
        assert_eq!(picked.width, 7);
    }
}
