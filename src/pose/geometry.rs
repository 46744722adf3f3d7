//! Angle and geometry utilities shared by the exercise analyzers.
//!
//! Image coordinates: x grows right, y grows down.

use super::{Joint, Keypoint, PoseFrame};

/// Angle at vertex `b` formed by rays `b→a` and `b→c`, in degrees [0, 180]
///
/// Uses the difference of the two ray headings and folds reflex angles
/// back into range. Degenerate (zero-length) rays yield 180°.
pub fn angle_between(a: Keypoint, b: Keypoint, c: Keypoint) -> f32 {
    let ray_a = (a.x - b.x, a.y - b.y);
    let ray_c = (c.x - b.x, c.y - b.y);

    if (ray_a.0.abs() < 1e-6 && ray_a.1.abs() < 1e-6)
        || (ray_c.0.abs() < 1e-6 && ray_c.1.abs() < 1e-6)
    {
        return 180.0;
    }

    let radians = ray_c.1.atan2(ray_c.0) - ray_a.1.atan2(ray_a.0);
    let mut angle = radians.to_degrees().abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    angle
}

pub fn distance(a: Keypoint, b: Keypoint) -> f32 {
    ((a.x - b.x).powi(2) + (a.y - b.y).powi(2)).sqrt()
}

pub fn midpoint(a: Keypoint, b: Keypoint) -> Keypoint {
    Keypoint::new(
        (a.x + b.x) / 2.0,
        (a.y + b.y) / 2.0,
        a.confidence.min(b.confidence),
    )
}

/// Mean vertical position of the given joints
pub fn mean_y(frame: &PoseFrame, joints: &[Joint]) -> f32 {
    if joints.is_empty() {
        return 0.0;
    }
    joints.iter().map(|joint| frame.joint(*joint).y).sum::<f32>() / joints.len() as f32
}

pub fn average_ankle_y(frame: &PoseFrame) -> f32 {
    mean_y(frame, &[Joint::LeftAnkle, Joint::RightAnkle])
}

pub fn average_shoulder_y(frame: &PoseFrame) -> f32 {
    mean_y(frame, &[Joint::LeftShoulder, Joint::RightShoulder])
}

pub fn average_wrist_y(frame: &PoseFrame) -> f32 {
    mean_y(frame, &[Joint::LeftWrist, Joint::RightWrist])
}

/// Mean of the left and right hip-knee-ankle angles
pub fn average_knee_angle(frame: &PoseFrame) -> f32 {
    let left = angle_between(
        frame.joint(Joint::LeftHip),
        frame.joint(Joint::LeftKnee),
        frame.joint(Joint::LeftAnkle),
    );
    let right = angle_between(
        frame.joint(Joint::RightHip),
        frame.joint(Joint::RightKnee),
        frame.joint(Joint::RightAnkle),
    );
    (left + right) / 2.0
}

/// Larger of the two shoulder-elbow-wrist angles
pub fn max_elbow_angle(frame: &PoseFrame) -> f32 {
    let left = angle_between(
        frame.joint(Joint::LeftShoulder),
        frame.joint(Joint::LeftElbow),
        frame.joint(Joint::LeftWrist),
    );
    let right = angle_between(
        frame.joint(Joint::RightShoulder),
        frame.joint(Joint::RightElbow),
        frame.joint(Joint::RightWrist),
    );
    left.max(right)
}

/// Mean shoulder→elbow length, the scale unit for pull-up thresholds
pub fn upper_arm_length(frame: &PoseFrame) -> f32 {
    let left = distance(frame.joint(Joint::LeftShoulder), frame.joint(Joint::LeftElbow));
    let right = distance(
        frame.joint(Joint::RightShoulder),
        frame.joint(Joint::RightElbow),
    );
    (left + right) / 2.0
}

/// Horizontal distance between a left/right joint pair
pub fn horizontal_span(frame: &PoseFrame, left: Joint, right: Joint) -> f32 {
    (frame.joint(left).x - frame.joint(right).x).abs()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kp(x: f32, y: f32) -> Keypoint {
        Keypoint::new(x, y, 1.0)
    }

    #[test]
    fn test_straight_line_is_180() {
        let angle = angle_between(kp(0.0, 0.0), kp(0.5, 0.0), kp(1.0, 0.0));
        assert!((angle - 180.0).abs() < 1e-3);
    }

    #[test]
    fn test_right_angle() {
        let angle = angle_between(kp(0.0, 0.0), kp(0.5, 0.0), kp(0.5, 0.5));
        assert!((angle - 90.0).abs() < 1e-3);
    }

    #[test]
    fn test_reflex_difference_is_folded() {
        // Ray headings of roughly +170° and -170°: raw difference 340°, folded to 20°.
        let b = kp(0.0, 0.0);
        let a = kp(-10.0, 1.763);
        let c = kp(-10.0, -1.763);
        let angle = angle_between(a, b, c);
        assert!((angle - 20.0).abs() < 0.1, "got {}", angle);
    }

    #[test]
    fn test_angle_is_symmetric_in_endpoints() {
        let a = kp(3.0, 7.0);
        let b = kp(1.0, 1.0);
        let c = kp(-4.0, 2.0);
        assert!((angle_between(a, b, c) - angle_between(c, b, a)).abs() < 1e-3);
    }

    #[test]
    fn test_degenerate_ray_is_straight() {
        assert_eq!(angle_between(kp(1.0, 1.0), kp(1.0, 1.0), kp(2.0, 2.0)), 180.0);
    }

    #[test]
    fn test_angle_range() {
        for i in 0..36 {
            let theta = (i as f32 * 10.0).to_radians();
            let angle = angle_between(kp(1.0, 0.0), kp(0.0, 0.0), kp(theta.cos(), theta.sin()));
            assert!((0.0..=180.0).contains(&angle));
        }
    }

    #[test]
    fn test_midpoint_and_distance() {
        let m = midpoint(kp(0.0, 0.0), kp(4.0, 2.0));
        assert_eq!((m.x, m.y), (2.0, 1.0));
        assert!((distance(kp(0.0, 0.0), kp(3.0, 4.0)) - 5.0).abs() < 1e-6);
    }
}
