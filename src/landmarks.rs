use thiserror::Error;

use crate::types::Handedness;

pub const NUM_LANDMARKS: usize = 21;

pub const THUMB_IP: usize = 3;
pub const THUMB_TIP: usize = 4;
pub const INDEX_MCP: usize = 5;
pub const PINKY_MCP: usize = 17;

const BOX_PADDING_PX: f32 = 20.0;

#[derive(Debug, Error, PartialEq)]
pub enum LandmarkError {
    #[error("invalid landmark input: {0}")]
    InvalidInput(String),
}

/// A landmark in normalized image coordinates.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct LandmarkPoint {
    pub x: f32,
    pub y: f32,
}

impl LandmarkPoint {
    pub const fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }
}

impl From<(f32, f32)> for LandmarkPoint {
    fn from((x, y): (f32, f32)) -> Self {
        Self { x, y }
    }
}

/// The 21 landmarks of one hand, in the hand-pose model's index order.
#[derive(Clone, Debug, PartialEq)]
pub struct LandmarkSet {
    points: [LandmarkPoint; NUM_LANDMARKS],
}

impl LandmarkSet {
    pub fn new(points: &[LandmarkPoint]) -> Result<Self, LandmarkError> {
        let points: [LandmarkPoint; NUM_LANDMARKS] = points.try_into().map_err(|_| {
            LandmarkError::InvalidInput(format!(
                "expected {NUM_LANDMARKS} landmarks, got {}",
                points.len()
            ))
        })?;

        if let Some(idx) = points
            .iter()
            .position(|p| !p.x.is_finite() || !p.y.is_finite())
        {
            return Err(LandmarkError::InvalidInput(format!(
                "landmark {idx} has a non-finite coordinate"
            )));
        }

        Ok(Self { points })
    }

    /// Normalizes pixel-space landmarks by the frame size.
    pub fn from_pixels(
        pixels: &[(f32, f32)],
        width: u32,
        height: u32,
    ) -> Result<Self, LandmarkError> {
        if width == 0 || height == 0 {
            return Err(LandmarkError::InvalidInput(format!(
                "frame size {width}x{height} is empty"
            )));
        }
        let (w, h) = (width as f32, height as f32);
        let points: Vec<LandmarkPoint> = pixels
            .iter()
            .map(|&(x, y)| LandmarkPoint::new(x / w, y / h))
            .collect();
        Self::new(&points)
    }

    pub fn point(&self, idx: usize) -> LandmarkPoint {
        self.points[idx]
    }

    pub fn points(&self) -> &[LandmarkPoint] {
        &self.points
    }

    /// Padded pixel bounding box `(x_min, y_min, x_max, y_max)`, clamped to the frame.
    pub fn bounding_box(&self, width: u32, height: u32) -> HandBox {
        let (w, h) = (width as f32, height as f32);
        let (mut min_x, mut min_y) = (f32::MAX, f32::MAX);
        let (mut max_x, mut max_y) = (f32::MIN, f32::MIN);

        for p in &self.points {
            min_x = min_x.min(p.x * w);
            min_y = min_y.min(p.y * h);
            max_x = max_x.max(p.x * w);
            max_y = max_y.max(p.y * h);
        }

        HandBox {
            x_min: (min_x - BOX_PADDING_PX).clamp(0.0, w) as u32,
            y_min: (min_y - BOX_PADDING_PX).clamp(0.0, h) as u32,
            x_max: (max_x + BOX_PADDING_PX).clamp(0.0, w) as u32,
            y_max: (max_y + BOX_PADDING_PX).clamp(0.0, h) as u32,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct HandBox {
    pub x_min: u32,
    pub y_min: u32,
    pub x_max: u32,
    pub y_max: u32,
}

/// One detected hand as delivered by the landmark source.
#[derive(Clone, Debug)]
pub struct HandObservation {
    pub landmarks: LandmarkSet,
    pub handedness: Handedness,
    pub confidence: f32,
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_wrong_count() {
        let points = vec![LandmarkPoint::default(); 20];
        assert!(matches!(
            LandmarkSet::new(&points),
            Err(LandmarkError::InvalidInput(_))
        ));
        let points = vec![LandmarkPoint::default(); 22];
        assert!(LandmarkSet::new(&points).is_err());
        assert!(LandmarkSet::new(&[]).is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        let mut points = vec![LandmarkPoint::new(0.5, 0.5); NUM_LANDMARKS];
        points[7].y = f32::NAN;
        assert!(matches!(
            LandmarkSet::new(&points),
            Err(LandmarkError::InvalidInput(msg)) if msg.contains("landmark 7")
        ));
    }

    #[test]
    fn test_from_pixels_normalizes() {
        let pixels = vec![(320.0, 240.0); NUM_LANDMARKS];
        let set = LandmarkSet::from_pixels(&pixels, 640, 480).unwrap();
        assert_eq!(set.point(0), LandmarkPoint::new(0.5, 0.5));
        assert!(LandmarkSet::from_pixels(&pixels, 0, 480).is_err());
    }

    #[test]
    fn test_bounding_box_is_padded_and_clamped() {
        let set = fixtures::open_hand();
        let bbox = set.bounding_box(100, 100);
        // x spans 0.3..0.6, y spans 0.4..0.9 before padding
        assert!(bbox.x_min.abs_diff(10) <= 1);
        assert!(bbox.x_max.abs_diff(80) <= 1);
        assert!(bbox.y_min.abs_diff(20) <= 1);
        assert_eq!(bbox.y_max, 100);
    }
}
