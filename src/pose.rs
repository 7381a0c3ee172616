//! Rigid-body pose algebra shared across the tracker.
//!
//! Grounded in the reference driver's `oposef_*`/`oquatf_*` helpers
//! (`rift-tracker.c`, `rift-sensor.c`): pose composition, inversion, and the
//! HMD axis-convention mirror used on bootstrap and submission.

use nalgebra::{UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

/// A 6-DOF rigid-body pose: position plus orientation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    /// Position in the parent frame.
    pub position: Vector3<f64>,
    /// Orientation relative to the parent frame.
    pub orientation: UnitQuaternion<f64>,
}

impl Pose {
    /// The identity pose: zero position, no rotation.
    #[must_use]
    pub fn identity() -> Self {
        Pose { position: Vector3::zeros(), orientation: UnitQuaternion::identity() }
    }

    /// Composes `self ∘ other`: transforms `other` into `self`'s parent
    /// frame. If `self` is `a_from_b` and `other` is `b_from_c`, the result
    /// is `a_from_c`.
    #[must_use]
    pub fn compose(&self, other: &Pose) -> Pose {
        Pose {
            position: self.position + self.orientation * other.position,
            orientation: self.orientation * other.orientation,
        }
    }

    /// The inverse transform: if `self` is `a_from_b`, returns `b_from_a`.
    #[must_use]
    pub fn inverse(&self) -> Pose {
        let inv_orientation = self.orientation.inverse();
        Pose { position: inv_orientation * -self.position, orientation: inv_orientation }
    }

    /// Applies this pose to a point expressed in the parent frame's child,
    /// returning it in the parent frame.
    #[must_use]
    pub fn apply(&self, point: &Vector3<f64>) -> Vector3<f64> {
        self.position + self.orientation * point
    }

    /// The HMD axis-convention shim (spec.md §4.4/§4.5): mirrors the X and Z
    /// axes of both position and orientation. Applied once on bootstrap
    /// (camera pose from the first HMD observation) and once on submission
    /// (model-space pose back out to the fusion filter), so the two
    /// applications cancel for any device that isn't the HMD.
    #[must_use]
    pub fn mirror_xz(&self) -> Pose {
        let flip = Vector3::new(-1.0, 1.0, -1.0);
        let position = self.position.component_mul(&flip);
        let (w, i, j, k) = (
            self.orientation.w,
            self.orientation.i,
            self.orientation.j,
            self.orientation.k,
        );
        let orientation = UnitQuaternion::new_unchecked(nalgebra::Quaternion::new(w, i, -j, k));
        Pose { position, orientation }
    }

    /// Decomposes `orientation` into a swing about `axis` and the remaining
    /// twist, following the standard swing-twist decomposition. `axis` must
    /// be unit length. Used by the aligned deep search (spec.md §4.3) to
    /// constrain the search to orientations within a tolerance of the prior
    /// swing.
    #[must_use]
    pub fn swing_twist(&self, axis: &Vector3<f64>) -> (UnitQuaternion<f64>, UnitQuaternion<f64>) {
        let q = self.orientation;
        let rotation_axis = Vector3::new(q.i, q.j, q.k);
        let projection = rotation_axis.dot(axis) * axis;
        let twist_raw = nalgebra::Quaternion::new(q.w, projection.x, projection.y, projection.z);
        let twist = if twist_raw.norm() > 1e-9 {
            UnitQuaternion::new_normalize(twist_raw)
        } else {
            UnitQuaternion::identity()
        };
        let swing = q * twist.inverse();
        (swing, twist)
    }
}

/// An exponential-smoothing filter over a [`Pose`], keyed on a monotonic
/// device-time so repeated calls at the same timestamp are no-ops (spec.md
/// §4.8).
#[derive(Debug, Clone)]
pub struct SmoothedPose {
    alpha: f64,
    last_time_ns: Option<u64>,
    value: Pose,
}

impl SmoothedPose {
    /// Creates a smoother with blend factor `alpha` in `(0, 1]`: `1.0`
    /// disables smoothing entirely.
    #[must_use]
    pub fn new(alpha: f64) -> Self {
        SmoothedPose { alpha, last_time_ns: None, value: Pose::identity() }
    }

    /// Feeds in a new raw sample at `time_ns`, blending it with the
    /// previous output, and returns the smoothed result.
    pub fn update(&mut self, time_ns: u64, raw: Pose) -> Pose {
        self.value = match self.last_time_ns {
            Some(last) if last == time_ns => self.value,
            Some(_) => Pose {
                position: self.value.position.lerp(&raw.position, self.alpha),
                orientation: self.value.orientation.slerp(&raw.orientation, self.alpha),
            },
            None => raw,
        };
        self.last_time_ns = Some(time_ns);
        self.value
    }

    /// The current smoothed value without feeding in a new sample.
    #[must_use]
    pub fn current(&self) -> Pose {
        self.value
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn compose_then_inverse_is_identity() {
        let a = Pose {
            position: Vector3::new(1.0, 2.0, 3.0),
            orientation: UnitQuaternion::from_euler_angles(0.1, 0.2, 0.3),
        };
        let roundtrip = a.compose(&a.inverse());
        assert_relative_eq!(roundtrip.position, Vector3::zeros(), epsilon = 1e-9);
        assert_relative_eq!(roundtrip.orientation.angle(), 0.0, epsilon = 1e-9);
    }

    #[test]
    fn mirror_xz_is_involution() {
        let a = Pose {
            position: Vector3::new(1.0, 2.0, 3.0),
            orientation: UnitQuaternion::from_euler_angles(0.1, -0.2, 0.4),
        };
        let twice = a.mirror_xz().mirror_xz();
        assert_relative_eq!(twice.position, a.position, epsilon = 1e-9);
        assert_relative_eq!(twice.orientation.angle(), a.orientation.angle(), epsilon = 1e-9);
    }

    #[test]
    fn swing_twist_recomposes_original() {
        let axis = Vector3::y_axis().into_inner();
        let pose = Pose {
            position: Vector3::zeros(),
            orientation: UnitQuaternion::from_euler_angles(0.3, 0.5, -0.2),
        };
        let (swing, twist) = pose.swing_twist(&axis);
        let recomposed = swing * twist;
        assert_relative_eq!(recomposed.angle(), pose.orientation.angle(), epsilon = 1e-6);
    }

    #[test]
    fn smoothed_pose_blends_toward_target() {
        let mut smoother = SmoothedPose::new(0.5);
        let a = Pose { position: Vector3::new(0.0, 0.0, 0.0), orientation: UnitQuaternion::identity() };
        let b = Pose { position: Vector3::new(2.0, 0.0, 0.0), orientation: UnitQuaternion::identity() };
        smoother.update(0, a);
        let out = smoother.update(1, b);
        assert_relative_eq!(out.position.x, 1.0, epsilon = 1e-9);
    }
}
