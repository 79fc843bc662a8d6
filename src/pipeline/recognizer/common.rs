use anyhow::{Context, Result, anyhow};
use fast_image_resize as fir;
use ndarray::Array4;
use rayon::prelude::*;

use crate::{
    landmarks::{HandObservation, LandmarkError, LandmarkSet, NUM_LANDMARKS},
    types::{Frame, Handedness},
};

pub const INPUT_SIZE: u32 = 224;

/// Raw output of the hand-pose model for one frame.
#[derive(Clone, Debug)]
pub struct HandposeOutput {
    /// Landmarks projected back into frame pixels.
    pub projected_landmarks: Vec<(f32, f32)>,
    pub confidence: f32,
    pub handedness: f32,
}

impl HandposeOutput {
    /// `None` when the model is not confident a hand is present.
    pub fn observation(
        &self,
        width: u32,
        height: u32,
        min_confidence: f32,
    ) -> Result<Option<HandObservation>, LandmarkError> {
        if self.confidence < min_confidence {
            return Ok(None);
        }

        let landmarks = LandmarkSet::from_pixels(&self.projected_landmarks, width, height)?;
        Ok(Some(HandObservation {
            landmarks,
            handedness: Handedness::from_score(self.handedness),
            confidence: self.confidence,
        }))
    }
}

#[derive(Clone, Debug)]
pub struct LetterboxInfo {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
    pub orig_w: u32,
    pub orig_h: u32,
}

/// Letterboxes the frame into a normalized `1 × 224 × 224 × 3` input tensor.
pub fn prepare_frame(frame: &Frame) -> Result<(Array4<f32>, LetterboxInfo)> {
    let target_size = INPUT_SIZE;
    let expected_len = (frame.width as usize)
        .saturating_mul(frame.height as usize)
        .saturating_mul(4);
    if frame.rgba.len() != expected_len || expected_len == 0 {
        return Err(anyhow!(
            "frame buffer size mismatch: got {}, expected {}",
            frame.rgba.len(),
            expected_len
        ));
    }

    let scale = target_size as f32 / (frame.width.max(frame.height) as f32);
    let new_w = ((frame.width as f32 * scale).round().max(1.0) as u32).min(target_size);
    let new_h = ((frame.height as f32 * scale).round().max(1.0) as u32).min(target_size);

    let src_image = fir::images::Image::from_vec_u8(
        frame.width,
        frame.height,
        frame.rgba.clone(),
        fir::PixelType::U8x4,
    )?;
    let mut dst_image = fir::images::Image::new(new_w, new_h, fir::PixelType::U8x4);
    let mut resizer = fir::Resizer::new();
    let resize_options = fir::ResizeOptions::new()
        .resize_alg(fir::ResizeAlg::Interpolation(fir::FilterType::Bilinear));
    resizer
        .resize(&src_image, &mut dst_image, Some(&resize_options))
        .context("fast resize failed")?;
    let resized = dst_image.into_vec();

    let pad_x = ((target_size - new_w) / 2) as usize;
    let pad_y = ((target_size - new_h) / 2) as usize;
    let mut canvas = vec![0u8; (target_size as usize) * (target_size as usize) * 4];
    for px in canvas.chunks_mut(4) {
        px[3] = 255;
    }
    let dst_stride = target_size as usize * 4;
    let src_stride = new_w as usize * 4;
    for row in 0..(new_h as usize) {
        let dst_offset = (pad_y + row) * dst_stride + pad_x * 4;
        let src_offset = row * src_stride;
        canvas[dst_offset..dst_offset + src_stride]
            .copy_from_slice(&resized[src_offset..src_offset + src_stride]);
    }

    let normalized: Vec<f32> = canvas
        .par_chunks_exact(4)
        .flat_map_iter(|px| {
            [
                px[0] as f32 / 255.0,
                px[1] as f32 / 255.0,
                px[2] as f32 / 255.0,
            ]
        })
        .collect();
    let input = Array4::<f32>::from_shape_vec(
        (1, target_size as usize, target_size as usize, 3),
        normalized,
    )
    .map_err(|err| anyhow!("failed to build input tensor: {err}"))?;

    let letterbox = LetterboxInfo {
        scale,
        pad_x: pad_x as f32,
        pad_y: pad_y as f32,
        orig_w: frame.width,
        orig_h: frame.height,
    };

    Ok((input, letterbox))
}

/// Splits the model's flat `[x, y, z, ...]` output into 21 landmarks.
pub fn decode_landmarks(flat: &[f32]) -> Result<Vec<[f32; 3]>> {
    if flat.len() < NUM_LANDMARKS * 3 {
        return Err(anyhow!(
            "unexpected landmarks length: got {}, need {}",
            flat.len(),
            NUM_LANDMARKS * 3
        ));
    }

    Ok(flat
        .chunks_exact(3)
        .take(NUM_LANDMARKS)
        .map(|chunk| [chunk[0], chunk[1], chunk[2]])
        .collect())
}

pub fn project_landmarks(landmarks: &[[f32; 3]], letterbox: &LetterboxInfo) -> Vec<(f32, f32)> {
    landmarks
        .iter()
        .map(|[x, y, _z]| {
            let px = (x - letterbox.pad_x) / letterbox.scale;
            let py = (y - letterbox.pad_y) / letterbox.scale;
            let cx = px.clamp(0.0, (letterbox.orig_w.saturating_sub(1)) as f32);
            let cy = py.clamp(0.0, (letterbox.orig_h.saturating_sub(1)) as f32);
            (cx, cy)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Instant;

    fn letterbox() -> LetterboxInfo {
        // 640x480 frame squeezed into 224: scale 0.35, 28px bars top and bottom
        LetterboxInfo {
            scale: 0.35,
            pad_x: 0.0,
            pad_y: 28.0,
            orig_w: 640,
            orig_h: 480,
        }
    }

    #[test]
    fn test_decode_rejects_short_output() {
        assert!(decode_landmarks(&[0.0; 62]).is_err());
        let decoded = decode_landmarks(&[1.0; 66]).unwrap();
        assert_eq!(decoded.len(), NUM_LANDMARKS);
    }

    #[test]
    fn test_project_undoes_letterbox() {
        let projected = project_landmarks(&[[112.0, 112.0, 0.0], [-5.0, 500.0, 0.0]], &letterbox());
        assert!((projected[0].0 - 320.0).abs() < 1e-3);
        assert!((projected[0].1 - 240.0).abs() < 1e-3);
        // clamped to the frame
        assert_eq!(projected[1], (0.0, 479.0));
    }

    #[test]
    fn test_observation_respects_confidence() {
        let output = HandposeOutput {
            projected_landmarks: vec![(320.0, 240.0); NUM_LANDMARKS],
            confidence: 0.1,
            handedness: 0.8,
        };
        assert_eq!(output.observation(640, 480, 0.2).unwrap().map(|o| o.confidence), None);

        let output = HandposeOutput {
            confidence: 0.9,
            ..output
        };
        let observation = output.observation(640, 480, 0.2).unwrap().unwrap();
        assert_eq!(observation.handedness, Handedness::Right);
        assert_eq!(observation.landmarks.point(0).x, 0.5);
    }

    #[test]
    fn test_observation_rejects_short_landmark_list() {
        let output = HandposeOutput {
            projected_landmarks: vec![(1.0, 1.0); 5],
            confidence: 0.9,
            handedness: 0.8,
        };
        assert!(matches!(
            output.observation(640, 480, 0.2),
            Err(LandmarkError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_prepare_frame_rejects_bad_buffer() {
        let frame = Frame {
            rgba: vec![0; 10],
            width: 4,
            height: 4,
            timestamp: Instant::now(),
        };
        assert!(prepare_frame(&frame).is_err());
    }
}
