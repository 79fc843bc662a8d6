use std::{fmt, str::FromStr, time::Instant};

#[derive(Clone, Debug)]
pub struct Frame {
    pub rgba: Vec<u8>,
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Handedness {
    Left,
    Right,
    Unknown,
}

impl Handedness {
    /// Maps the hand-pose model's handedness score onto a side.
    pub fn from_score(score: f32) -> Self {
        if score >= 0.5 {
            Handedness::Right
        } else if score > 0.0 {
            Handedness::Left
        } else {
            Handedness::Unknown
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Handedness::Left => "Left",
            Handedness::Right => "Right",
            Handedness::Unknown => "Unknown",
        }
    }
}

impl FromStr for Handedness {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let side = if s.eq_ignore_ascii_case("left") {
            Handedness::Left
        } else if s.eq_ignore_ascii_case("right") {
            Handedness::Right
        } else {
            Handedness::Unknown
        };
        Ok(side)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Finger {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl Finger {
    pub const ALL: [Finger; 5] = [
        Finger::Thumb,
        Finger::Index,
        Finger::Middle,
        Finger::Ring,
        Finger::Pinky,
    ];

    /// (base, joint, tip) landmark indices used for the joint angle.
    pub fn angle_triple(&self) -> (usize, usize, usize) {
        match self {
            Finger::Thumb => (1, 2, 4),
            Finger::Index => (5, 6, 8),
            Finger::Middle => (9, 10, 12),
            Finger::Ring => (13, 14, 16),
            Finger::Pinky => (17, 18, 20),
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Finger::Thumb => "thumb",
            Finger::Index => "index",
            Finger::Middle => "middle",
            Finger::Ring => "ring",
            Finger::Pinky => "pinky",
        }
    }

    pub fn short_label(&self) -> &'static str {
        match self {
            Finger::Thumb => "T",
            Finger::Index => "I",
            Finger::Middle => "M",
            Finger::Ring => "R",
            Finger::Pinky => "P",
        }
    }
}

/// Joint angle per finger, in degrees.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FingerAngles {
    pub thumb: f32,
    pub index: f32,
    pub middle: f32,
    pub ring: f32,
    pub pinky: f32,
}

impl FingerAngles {
    pub fn get(&self, finger: Finger) -> f32 {
        match finger {
            Finger::Thumb => self.thumb,
            Finger::Index => self.index,
            Finger::Middle => self.middle,
            Finger::Ring => self.ring,
            Finger::Pinky => self.pinky,
        }
    }

    pub fn summary(&self) -> String {
        Finger::ALL
            .iter()
            .map(|finger| format!("{} {:.0}°", finger.label(), self.get(*finger)))
            .collect::<Vec<_>>()
            .join(", ")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FingerExtension {
    pub thumb: bool,
    pub index: bool,
    pub middle: bool,
    pub ring: bool,
    pub pinky: bool,
}

impl FingerExtension {
    /// Builds a vector from flags in thumb, index, middle, ring, pinky order.
    pub fn from_flags(flags: [bool; 5]) -> Self {
        let [thumb, index, middle, ring, pinky] = flags;
        Self {
            thumb,
            index,
            middle,
            ring,
            pinky,
        }
    }

    pub fn as_flags(&self) -> [bool; 5] {
        [self.thumb, self.index, self.middle, self.ring, self.pinky]
    }

    pub fn get(&self, finger: Finger) -> bool {
        match finger {
            Finger::Thumb => self.thumb,
            Finger::Index => self.index,
            Finger::Middle => self.middle,
            Finger::Ring => self.ring,
            Finger::Pinky => self.pinky,
        }
    }

    pub fn count(&self) -> u8 {
        self.as_flags().iter().filter(|up| **up).count() as u8
    }

    /// True when exactly the given fingers are extended.
    pub fn is_exactly(&self, fingers: &[Finger]) -> bool {
        Finger::ALL
            .iter()
            .all(|finger| self.get(*finger) == fingers.contains(finger))
    }

    pub fn summary(&self) -> String {
        Finger::ALL
            .iter()
            .map(|finger| {
                if self.get(*finger) {
                    finger.short_label().to_string()
                } else {
                    "-".to_string()
                }
            })
            .collect()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum GestureKind {
    Fist,
    OpenHand,
    ThumbsUp,
    Peace,
    Rock,
    Ok,
    Pointing,
    Custom,
}

impl GestureKind {
    pub const COUNT: usize = 8;

    pub const ALL: [GestureKind; GestureKind::COUNT] = [
        GestureKind::Fist,
        GestureKind::OpenHand,
        GestureKind::ThumbsUp,
        GestureKind::Peace,
        GestureKind::Rock,
        GestureKind::Ok,
        GestureKind::Pointing,
        GestureKind::Custom,
    ];

    pub fn display_name(&self) -> &'static str {
        match self {
            GestureKind::Fist => "Fist",
            GestureKind::OpenHand => "Open hand",
            GestureKind::ThumbsUp => "Thumbs up",
            GestureKind::Peace => "Peace",
            GestureKind::Rock => "Rock",
            GestureKind::Ok => "OK",
            GestureKind::Pointing => "Pointing",
            GestureKind::Custom => "Custom",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            GestureKind::Fist => "✊ ",
            GestureKind::OpenHand => "🖐 ",
            GestureKind::ThumbsUp => "👍 ",
            GestureKind::Peace => "✌️ ",
            GestureKind::Rock => "🤘 ",
            GestureKind::Ok => "👌 ",
            GestureKind::Pointing => "☝️ ",
            GestureKind::Custom => "⋯ ",
        }
    }

    pub fn index(&self) -> usize {
        match self {
            GestureKind::Fist => 0,
            GestureKind::OpenHand => 1,
            GestureKind::ThumbsUp => 2,
            GestureKind::Peace => 3,
            GestureKind::Rock => 4,
            GestureKind::Ok => 5,
            GestureKind::Pointing => 6,
            GestureKind::Custom => 7,
        }
    }
}

impl fmt::Display for GestureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct HandReport {
    pub raw_count: u8,
    pub smoothed_count: u8,
    pub extension: FingerExtension,
    pub angles: FingerAngles,
    pub gesture: GestureKind,
    pub handedness: Handedness,
    pub confidence: f32,
}

impl HandReport {
    pub fn display_text(&self) -> String {
        match self.gesture {
            GestureKind::Custom => format!(
                "{}{} ({} fingers)",
                self.gesture.emoji(),
                self.gesture.display_name(),
                self.raw_count
            ),
            gesture => format!("{}{}", gesture.emoji(), gesture.display_name()),
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub enum FrameReport {
    NoHand { smoothed_count: Option<u8> },
    Hand(HandReport),
}

impl FrameReport {
    #[cfg(test)]
    pub fn smoothed_count(&self) -> Option<u8> {
        match self {
            FrameReport::NoHand { smoothed_count } => *smoothed_count,
            FrameReport::Hand(report) => Some(report.smoothed_count),
        }
    }

    pub fn display_text(&self) -> String {
        match self {
            FrameReport::NoHand {
                smoothed_count: Some(count),
            } => format!("no hand (fingers {count})"),
            FrameReport::NoHand {
                smoothed_count: None,
            } => "no hand".to_string(),
            FrameReport::Hand(report) => format!(
                "{} hand | fingers {} | {} | {}",
                report.handedness.label(),
                report.smoothed_count,
                report.extension.summary(),
                report.display_text()
            ),
        }
    }
}

#[derive(Clone, Debug)]
pub struct RecognizedFrame {
    pub width: u32,
    pub height: u32,
    pub timestamp: Instant,
    pub report: FrameReport,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_count_matches_flags() {
        for bits in 0u8..32 {
            let flags = [
                bits & 1 != 0,
                bits & 2 != 0,
                bits & 4 != 0,
                bits & 8 != 0,
                bits & 16 != 0,
            ];
            let extension = FingerExtension::from_flags(flags);
            let expected = flags.iter().filter(|f| **f).count() as u8;
            assert_eq!(extension.count(), expected);
            assert_eq!(extension.count() as u32, bits.count_ones());
        }
    }

    #[test]
    fn test_is_exactly() {
        let peace = FingerExtension::from_flags([false, true, true, false, false]);
        assert!(peace.is_exactly(&[Finger::Index, Finger::Middle]));
        assert!(!peace.is_exactly(&[Finger::Index]));
        assert!(!peace.is_exactly(&[Finger::Index, Finger::Middle, Finger::Thumb]));
    }

    #[test]
    fn test_handedness_parsing() {
        assert_eq!("Left".parse::<Handedness>().unwrap(), Handedness::Left);
        assert_eq!("right".parse::<Handedness>().unwrap(), Handedness::Right);
        assert_eq!("".parse::<Handedness>().unwrap(), Handedness::Unknown);
        assert_eq!(Handedness::from_score(0.9), Handedness::Right);
        assert_eq!(Handedness::from_score(0.1), Handedness::Left);
        assert_eq!(Handedness::from_score(0.0), Handedness::Unknown);
    }

    #[test]
    fn test_custom_display_reports_count() {
        let report = HandReport {
            raw_count: 3,
            smoothed_count: 3,
            extension: FingerExtension::from_flags([true, true, true, false, false]),
            angles: FingerAngles::default(),
            gesture: GestureKind::Custom,
            handedness: Handedness::Right,
            confidence: 0.9,
        };
        assert!(report.display_text().contains("3 fingers"));
    }
}
