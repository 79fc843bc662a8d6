use crate::{
    config::DetectorConfig,
    types::{Finger, FingerAngles, FingerExtension, GestureKind},
};

/// Maps the extension vector to a gesture. Rules are checked in order and
/// the first match wins; anything left over is `Custom`.
pub fn classify_gesture(
    extension: &FingerExtension,
    angles: &FingerAngles,
    config: &DetectorConfig,
) -> GestureKind {
    use Finger::*;

    match extension.count() {
        0 => GestureKind::Fist,
        5 => GestureKind::OpenHand,
        1 if extension.thumb => GestureKind::ThumbsUp,
        1 if extension.index => GestureKind::Pointing,
        2 if extension.is_exactly(&[Index, Middle]) => GestureKind::Peace,
        2 if extension.is_exactly(&[Index, Pinky]) => GestureKind::Rock,
        3 if extension.is_exactly(&[Thumb, Index, Middle])
            && is_ok_pinch(angles, config) =>
        {
            GestureKind::Ok
        }
        _ => GestureKind::Custom,
    }
}

/// Thumb and index bent enough to close the OK circle, as opposed to a plain
/// three-finger spread.
fn is_ok_pinch(angles: &FingerAngles, config: &DetectorConfig) -> bool {
    angles.thumb < config.ok_angle_thumb_max && angles.index < config.ok_angle_index_max
}
