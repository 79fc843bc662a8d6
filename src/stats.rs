use std::{
    fmt,
    time::{Duration, Instant},
};

use crate::types::{FrameReport, GestureKind};

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DetectionStats {
    pub total_frames: u64,
    pub hands_detected: u64,
    gesture_counts: [u64; GestureKind::COUNT],
}

impl DetectionStats {
    pub fn record(&mut self, report: &FrameReport) {
        self.total_frames += 1;
        if let FrameReport::Hand(hand) = report {
            self.hands_detected += 1;
            self.gesture_counts[hand.gesture.index()] += 1;
        }
    }

    pub fn gesture_count(&self, gesture: GestureKind) -> u64 {
        self.gesture_counts[gesture.index()]
    }

    /// Share of frames with a hand, in percent.
    pub fn detection_rate(&self) -> Option<f64> {
        if self.total_frames == 0 {
            return None;
        }
        Some(self.hands_detected as f64 / self.total_frames as f64 * 100.0)
    }
}

impl fmt::Display for DetectionStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "frames processed: {}", self.total_frames)?;
        writeln!(f, "hands detected:   {}", self.hands_detected)?;
        if let Some(rate) = self.detection_rate() {
            writeln!(f, "detection rate:   {rate:.1}%")?;
        }
        for gesture in GestureKind::ALL {
            let count = self.gesture_count(gesture);
            if count > 0 {
                writeln!(f, "  {}{}: {count}", gesture.emoji(), gesture.display_name())?;
            }
        }
        Ok(())
    }
}

const FPS_INTERVAL: Duration = Duration::from_secs(1);

/// Frames counted over the last full one-second interval.
#[derive(Debug)]
pub struct FpsCounter {
    window_start: Instant,
    frames_in_window: u32,
    current: u32,
}

impl FpsCounter {
    pub fn new(now: Instant) -> Self {
        Self {
            window_start: now,
            frames_in_window: 0,
            current: 0,
        }
    }

    pub fn tick(&mut self, now: Instant) -> u32 {
        self.frames_in_window += 1;
        if now.duration_since(self.window_start) >= FPS_INTERVAL {
            self.current = self.frames_in_window;
            self.frames_in_window = 0;
            self.window_start = now;
        }
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{FingerAngles, FingerExtension, HandReport, Handedness};

    fn hand(gesture: GestureKind) -> FrameReport {
        FrameReport::Hand(HandReport {
            raw_count: 0,
            smoothed_count: 0,
            extension: FingerExtension::default(),
            angles: FingerAngles::default(),
            gesture,
            handedness: Handedness::Right,
            confidence: 0.9,
        })
    }

    #[test]
    fn test_counts_frames_hands_and_gestures() {
        let mut stats = DetectionStats::default();
        assert_eq!(stats.detection_rate(), None);

        stats.record(&hand(GestureKind::Fist));
        stats.record(&hand(GestureKind::Fist));
        stats.record(&hand(GestureKind::Peace));
        stats.record(&FrameReport::NoHand {
            smoothed_count: None,
        });

        assert_eq!(stats.total_frames, 4);
        assert_eq!(stats.hands_detected, 3);
        assert_eq!(stats.gesture_count(GestureKind::Fist), 2);
        assert_eq!(stats.gesture_count(GestureKind::Peace), 1);
        assert_eq!(stats.gesture_count(GestureKind::Rock), 0);
        assert_eq!(stats.detection_rate(), Some(75.0));

        let text = stats.to_string();
        assert!(text.contains("detection rate:   75.0%"));
        assert!(text.contains("Fist: 2"));
        assert!(!text.contains("Rock"));
    }

    #[test]
    fn test_fps_counter_rolls_over_each_second() {
        let start = Instant::now();
        let mut fps = FpsCounter::new(start);
        for i in 1..=29 {
            assert_eq!(fps.tick(start + Duration::from_millis(i * 30)), 0);
        }
        assert_eq!(fps.tick(start + Duration::from_millis(1_000)), 30);
        assert_eq!(fps.tick(start + Duration::from_millis(1_100)), 30);
    }
}
