//! Transform math for placed objects
//!
//! All poses are world-space `Mat4` values with column-vector convention:
//! `x_axis`/`y_axis`/`z_axis` hold the scaled basis, `w_axis` the translation.
//! Y is the up axis.

use glam::{Mat4, Quat, Vec3};

/// Fraction of the way an orientation moves toward a new hit per drag update
pub const ORIENTATION_SMOOTHING: f32 = 0.1;

/// Scales below this are treated as collapsed
const MIN_AXIS_SCALE: f32 = 1e-6;

/// World-space translation of a transform
pub fn translation(m: &Mat4) -> Vec3 {
    m.w_axis.truncate()
}

/// Orientation of a transform with its scale removed
pub fn orientation(m: &Mat4) -> Quat {
    let (_, rotation, _) = m.to_scale_rotation_translation();
    rotation.normalize()
}

/// Length of each basis vector (per-axis scale magnitude)
pub fn axis_scale(m: &Mat4) -> Vec3 {
    Vec3::new(
        m.x_axis.truncate().length(),
        m.y_axis.truncate().length(),
        m.z_axis.truncate().length(),
    )
}

/// Move `current` toward `hit` for a drag update
///
/// Position jumps to the hit position, orientation is slerped by `factor`,
/// and the object's own scale is kept.
pub fn smooth_toward(current: &Mat4, hit: &Mat4, factor: f32) -> Mat4 {
    let scale = axis_scale(current);
    let previous = orientation(current);
    let target = orientation(hit);
    let blended = previous.slerp(target, factor).normalize();

    Mat4::from_scale_rotation_translation(scale, blended, translation(hit))
}

/// Replace only the vertical translation component
pub fn with_height(m: &Mat4, height: f32) -> Mat4 {
    let mut out = *m;
    out.w_axis.y = height;
    out
}

/// Uniformly rescale so the principal (X) axis has length `target`
///
/// The correction factor is derived from the X axis alone and applied to all
/// three axes by right-multiplying a diagonal scale matrix, so orientation and
/// translation are untouched. Returns `None` when the current X scale has
/// collapsed or the requested scale is not a positive finite number.
pub fn rescaled(m: &Mat4, target: f32) -> Option<Mat4> {
    if !target.is_finite() || target <= 0.0 {
        return None;
    }

    let current = axis_scale(m).x;
    if !current.is_finite() || current < MIN_AXIS_SCALE {
        return None;
    }

    let factor = target / current;
    Some(*m * Mat4::from_scale(Vec3::splat(factor)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    const EPS: f32 = 1e-5;

    #[test]
    fn smoothing_takes_position_verbatim() {
        let current = Mat4::from_translation(Vec3::new(0.0, 1.0, 0.0));
        let hit = Mat4::from_rotation_translation(
            Quat::from_rotation_y(FRAC_PI_2),
            Vec3::new(1.0, 1.0, 0.0),
        );

        let out = smooth_toward(&current, &hit, ORIENTATION_SMOOTHING);

        assert_eq!(translation(&out), Vec3::new(1.0, 1.0, 0.0));
        let expected = Quat::from_rotation_y(FRAC_PI_2 * 0.1);
        assert!(orientation(&out).abs_diff_eq(expected, EPS));
    }

    #[test]
    fn smoothing_matches_slerp_for_arbitrary_pairs() {
        let pairs = [
            (Quat::IDENTITY, Quat::from_rotation_x(1.2)),
            (Quat::from_rotation_z(0.3), Quat::from_rotation_y(-2.0)),
            (
                Quat::from_axis_angle(Vec3::new(1.0, 1.0, 0.0).normalize(), 0.7),
                Quat::from_rotation_x(-0.4),
            ),
        ];

        for (prev, next) in pairs {
            let current = Mat4::from_rotation_translation(prev, Vec3::ZERO);
            let hit = Mat4::from_rotation_translation(next, Vec3::new(2.0, 0.0, -1.0));
            let out = smooth_toward(&current, &hit, 0.1);
            let expected = prev.slerp(next, 0.1);
            // q and -q are the same rotation
            let got = orientation(&out);
            assert!(got.abs_diff_eq(expected, EPS) || got.abs_diff_eq(-expected, EPS));
        }
    }

    #[test]
    fn smoothing_keeps_object_scale() {
        let current = Mat4::from_scale(Vec3::splat(3.0));
        let hit = Mat4::from_translation(Vec3::X);
        let out = smooth_toward(&current, &hit, 0.1);
        assert!(axis_scale(&out).abs_diff_eq(Vec3::splat(3.0), EPS));
    }

    #[test]
    fn height_touches_only_vertical_component() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::splat(2.0),
            Quat::from_rotation_y(0.5),
            Vec3::new(4.0, 5.0, 6.0),
        );
        let out = with_height(&m, -1.5);

        assert_eq!(out.x_axis, m.x_axis);
        assert_eq!(out.y_axis, m.y_axis);
        assert_eq!(out.z_axis, m.z_axis);
        assert_eq!(out.w_axis.x, 4.0);
        assert_eq!(out.w_axis.y, -1.5);
        assert_eq!(out.w_axis.z, 6.0);
        assert_eq!(out.w_axis.w, 1.0);
    }

    #[test]
    fn rescale_sets_principal_axis_length() {
        let m = Mat4::from_scale_rotation_translation(
            Vec3::new(2.0, 3.0, 4.0),
            Quat::from_rotation_z(0.8),
            Vec3::new(1.0, 2.0, 3.0),
        );
        let out = rescaled(&m, 0.5).unwrap();
        let scale = axis_scale(&out);

        assert!((scale.x - 0.5).abs() < EPS);
        // uniform correction keeps the axis ratios
        assert!((scale.y - 0.75).abs() < EPS);
        assert!((scale.z - 1.0).abs() < EPS);
        assert_eq!(translation(&out), Vec3::new(1.0, 2.0, 3.0));
        assert!(orientation(&out).abs_diff_eq(Quat::from_rotation_z(0.8), EPS));
    }

    #[test]
    fn rescale_rejects_collapsed_or_invalid_scale() {
        assert!(rescaled(&Mat4::from_scale(Vec3::ZERO), 1.0).is_none());
        assert!(rescaled(&Mat4::IDENTITY, 0.0).is_none());
        assert!(rescaled(&Mat4::IDENTITY, f32::NAN).is_none());
        assert!(rescaled(&Mat4::IDENTITY, -2.0).is_none());
    }
}
