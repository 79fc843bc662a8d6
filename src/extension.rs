use crate::{
    config::{DetectorConfig, ThumbStrategy},
    landmarks::{INDEX_MCP, LandmarkSet, PINKY_MCP, THUMB_IP, THUMB_TIP},
    types::{FingerAngles, FingerExtension, Handedness},
};

/// A finger counts as extended only when its angle is strictly above the threshold.
pub fn is_extended(angle: f32, threshold: f32) -> bool {
    angle > threshold
}

/// Thumb extension from the tip's horizontal position relative to the IP joint.
pub fn thumb_extended_laterally(landmarks: &LandmarkSet, handedness: Handedness) -> bool {
    let tip = landmarks.point(THUMB_TIP);
    let ip = landmarks.point(THUMB_IP);

    // +1 when the thumb opens towards larger x in the image
    let outward = match handedness {
        Handedness::Right => 1.0,
        Handedness::Left => -1.0,
        Handedness::Unknown => {
            let index_mcp = landmarks.point(INDEX_MCP);
            let pinky_mcp = landmarks.point(PINKY_MCP);
            if index_mcp.x >= pinky_mcp.x { 1.0 } else { -1.0 }
        }
    };

    (tip.x - ip.x) * outward > 0.0
}

pub fn classify_extension(
    landmarks: &LandmarkSet,
    angles: &FingerAngles,
    handedness: Handedness,
    config: &DetectorConfig,
) -> FingerExtension {
    let thumb = match config.thumb_strategy {
        ThumbStrategy::Angle => is_extended(angles.thumb, config.thumb_threshold),
        ThumbStrategy::Lateral => thumb_extended_laterally(landmarks, handedness),
    };

    FingerExtension {
        thumb,
        index: is_extended(angles.index, config.finger_threshold),
        middle: is_extended(angles.middle, config.finger_threshold),
        ring: is_extended(angles.ring, config.finger_threshold),
        pinky: is_extended(angles.pinky, config.finger_threshold),
    }
}
