use crate::{
    angles::finger_angles,
    config::{AbsentHandPolicy, ConfigError, DetectorConfig},
    extension::classify_extension,
    gesture::classify_gesture,
    landmarks::HandObservation,
    smoothing::CountSmoother,
    stats::DetectionStats,
    types::{FrameReport, HandReport},
};

/// Turns one hand observation per frame into counts and a gesture.
///
/// Owns the only state that outlives a frame: the count history and the
/// running statistics.
pub struct FingerDetector {
    config: DetectorConfig,
    smoother: CountSmoother,
    stats: DetectionStats,
}

impl FingerDetector {
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let smoother = CountSmoother::new(config.smooth_window);
        Ok(Self {
            config,
            smoother,
            stats: DetectionStats::default(),
        })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn process(&mut self, observation: Option<&HandObservation>) -> FrameReport {
        let report = match observation {
            Some(hand) => FrameReport::Hand(self.process_hand(hand)),
            None => self.process_absent(),
        };
        self.stats.record(&report);
        report
    }

    fn process_hand(&mut self, hand: &HandObservation) -> HandReport {
        let angles = finger_angles(&hand.landmarks);
        let extension =
            classify_extension(&hand.landmarks, &angles, hand.handedness, &self.config);
        let raw_count = extension.count();
        let smoothed_count = self.smoother.update(raw_count);
        let gesture = classify_gesture(&extension, &angles, &self.config);

        HandReport {
            raw_count,
            smoothed_count,
            extension,
            angles,
            gesture,
            handedness: hand.handedness,
            confidence: hand.confidence,
        }
    }

    fn process_absent(&mut self) -> FrameReport {
        if self.config.absent_hand_policy == AbsentHandPolicy::Decay {
            self.smoother.push(0);
        }
        FrameReport::NoHand {
            smoothed_count: self.smoother.smoothed(),
        }
    }

    /// Drops the count history; statistics are kept.
    pub fn reset(&mut self) {
        self.smoother.reset();
        log::info!("smoothing history reset");
    }

    pub fn stats(&self) -> &DetectionStats {
        &self.stats
    }

    pub fn into_stats(self) -> DetectionStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        landmarks::{LandmarkPoint, LandmarkSet, fixtures},
        types::{Finger, GestureKind, Handedness},
    };

    fn observe(landmarks: LandmarkSet) -> HandObservation {
        HandObservation {
            landmarks,
            handedness: Handedness::Right,
            confidence: 0.95,
        }
    }

    fn peace_hand() -> LandmarkSet {
        let mut hand = fixtures::open_hand();
        for finger in [Finger::Thumb, Finger::Ring, Finger::Pinky] {
            hand = fixtures::curl(&hand, finger);
        }
        hand
    }

    fn hand_report(report: FrameReport) -> HandReport {
        match report {
            FrameReport::Hand(hand) => hand,
            other => panic!("expected a hand report, got {other:?}"),
        }
    }

    #[test]
    fn test_rejects_invalid_config() {
        let config = DetectorConfig {
            smooth_window: 0,
            ..DetectorConfig::default()
        };
        assert_eq!(
            FingerDetector::new(config).err(),
            Some(ConfigError::EmptyWindow)
        );
    }

    #[test]
    fn test_rejects_oversized_window() {
        let config = DetectorConfig {
            smooth_window: usize::MAX,
            ..DetectorConfig::default()
        };
        assert_eq!(
            FingerDetector::new(config).err(),
            Some(ConfigError::WindowTooLarge(usize::MAX))
        );
    }

    #[test]
    fn test_open_hand_end_to_end() {
        let mut detector = FingerDetector::new(DetectorConfig::default()).unwrap();
        let report = hand_report(detector.process(Some(&observe(fixtures::open_hand()))));
        assert_eq!(report.raw_count, 5);
        assert_eq!(report.smoothed_count, 5);
        assert_eq!(report.gesture, GestureKind::OpenHand);
        assert_eq!(report.extension.count(), report.raw_count);
    }

    #[test]
    fn test_peace_end_to_end() {
        let mut detector = FingerDetector::new(DetectorConfig::default()).unwrap();
        let report = hand_report(detector.process(Some(&observe(peace_hand()))));
        assert_eq!(report.raw_count, 2);
        assert_eq!(report.gesture, GestureKind::Peace);
    }

    #[test]
    fn test_degenerate_finger_is_not_extended() {
        let hand = fixtures::open_hand();
        let joint = hand.point(10);
        let collapsed = fixtures::with_point(&hand, 12, joint);
        let mut detector = FingerDetector::new(DetectorConfig::default()).unwrap();
        let report = hand_report(detector.process(Some(&observe(collapsed))));
        assert_eq!(report.angles.middle, 0.0);
        assert!(!report.extension.middle);
        assert_eq!(report.raw_count, 4);
    }

    #[test]
    fn test_smoothing_hides_single_outlier() {
        let mut detector = FingerDetector::new(DetectorConfig::default()).unwrap();
        for _ in 0..4 {
            detector.process(Some(&observe(fixtures::open_hand())));
        }
        let report = hand_report(detector.process(Some(&observe(peace_hand()))));
        assert_eq!(report.raw_count, 2);
        assert_eq!(report.smoothed_count, 5);
        // the gesture always follows the current frame
        assert_eq!(report.gesture, GestureKind::Peace);
    }

    #[test]
    fn test_skip_policy_keeps_count_when_hand_leaves() {
        let mut detector = FingerDetector::new(DetectorConfig::default()).unwrap();
        for _ in 0..3 {
            detector.process(Some(&observe(fixtures::open_hand())));
        }
        for _ in 0..10 {
            assert_eq!(
                detector.process(None),
                FrameReport::NoHand {
                    smoothed_count: Some(5)
                }
            );
        }
    }

    #[test]
    fn test_decay_policy_drives_count_to_zero() {
        let config = DetectorConfig {
            absent_hand_policy: AbsentHandPolicy::Decay,
            smooth_window: 5,
            ..DetectorConfig::default()
        };
        let mut detector = FingerDetector::new(config).unwrap();
        for _ in 0..5 {
            detector.process(Some(&observe(fixtures::open_hand())));
        }
        let mut last = None;
        for _ in 0..5 {
            last = detector.process(None).smoothed_count();
        }
        assert_eq!(last, Some(0));
    }

    #[test]
    fn test_no_hand_before_any_sample() {
        let mut detector = FingerDetector::new(DetectorConfig::default()).unwrap();
        assert_eq!(
            detector.process(None),
            FrameReport::NoHand {
                smoothed_count: None
            }
        );
    }

    #[test]
    fn test_full_history_is_idempotent() {
        let mut detector = FingerDetector::new(DetectorConfig::default()).unwrap();
        let hand = observe(peace_hand());
        for _ in 0..7 {
            detector.process(Some(&hand));
        }
        let first = detector.process(Some(&hand));
        for _ in 0..5 {
            assert_eq!(detector.process(Some(&hand)), first);
        }
    }

    #[test]
    fn test_reset_and_stats() {
        let mut detector = FingerDetector::new(DetectorConfig::default()).unwrap();
        for _ in 0..5 {
            detector.process(Some(&observe(fixtures::open_hand())));
        }
        detector.process(None);
        detector.reset();

        let report = hand_report(detector.process(Some(&observe(peace_hand()))));
        assert_eq!(report.smoothed_count, 2);

        let stats = detector.into_stats();
        assert_eq!(stats.total_frames, 7);
        assert_eq!(stats.hands_detected, 6);
        assert_eq!(stats.gesture_count(GestureKind::OpenHand), 5);
        assert_eq!(stats.gesture_count(GestureKind::Peace), 1);
    }

    #[test]
    fn test_lateral_thumb_end_to_end() {
        let config = DetectorConfig {
            thumb_strategy: crate::config::ThumbStrategy::Lateral,
            ..DetectorConfig::default()
        };
        let mut detector = FingerDetector::new(config).unwrap();

        // only the thumb stays up
        let mut hand = fixtures::open_hand();
        for finger in [Finger::Index, Finger::Middle, Finger::Ring, Finger::Pinky] {
            hand = fixtures::curl(&hand, finger);
        }
        let observation = HandObservation {
            landmarks: hand.clone(),
            handedness: Handedness::Left,
            confidence: 0.9,
        };
        let report = hand_report(detector.process(Some(&observation)));
        assert_eq!(report.gesture, GestureKind::ThumbsUp);

        let ip = hand.point(3);
        let tucked = fixtures::with_point(&hand, 4, LandmarkPoint::new(ip.x + 0.02, ip.y));
        let observation = HandObservation {
            landmarks: tucked,
            handedness: Handedness::Left,
            confidence: 0.9,
        };
        let report = hand_report(detector.process(Some(&observation)));
        assert_eq!(report.gesture, GestureKind::Fist);
    }
}
