//! Joint angles from hand landmarks.
//!
//! Each finger is reduced to a single angle measured at its middle joint,
//! between the vectors joint→base and joint→tip. A straight finger reads
//! close to 180°, a curled one much lower.

use crate::{
    landmarks::{LandmarkPoint, LandmarkSet},
    types::{Finger, FingerAngles},
};

/// Angle at `joint` in degrees, in `[0, 180]`.
///
/// Returns `0.0` when either vector has zero length.
pub fn joint_angle(base: LandmarkPoint, joint: LandmarkPoint, tip: LandmarkPoint) -> f32 {
    let v1 = (base.x - joint.x, base.y - joint.y);
    let v2 = (tip.x - joint.x, tip.y - joint.y);

    let mag1 = (v1.0 * v1.0 + v1.1 * v1.1).sqrt();
    let mag2 = (v2.0 * v2.0 + v2.1 * v2.1).sqrt();
    if mag1 == 0.0 || mag2 == 0.0 {
        return 0.0;
    }

    let dot = v1.0 * v2.0 + v1.1 * v2.1;
    let cos_angle = (dot / (mag1 * mag2)).clamp(-1.0, 1.0);

    cos_angle.acos().to_degrees()
}

pub fn finger_angle(landmarks: &LandmarkSet, finger: Finger) -> f32 {
    let (base, joint, tip) = finger.angle_triple();
    joint_angle(
        landmarks.point(base),
        landmarks.point(joint),
        landmarks.point(tip),
    )
}

pub fn finger_angles(landmarks: &LandmarkSet) -> FingerAngles {
    FingerAngles {
        thumb: finger_angle(landmarks, Finger::Thumb),
        index: finger_angle(landmarks, Finger::Index),
        middle: finger_angle(landmarks, Finger::Middle),
        ring: finger_angle(landmarks, Finger::Ring),
        pinky: finger_angle(landmarks, Finger::Pinky),
    }
}
