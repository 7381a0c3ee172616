//! Camera-pose bootstrap (spec.md §4.5): installing a sensor's
//! camera→world pose from the first sufficiently confident HMD
//! observation.

use super::Sensor;
use crate::frame::PerDeviceFrameState;
use crate::pose::Pose;

impl Sensor {
    /// Returns a freshly computed camera→world pose if `device_state`
    /// (already known to be the HMD's) is confident enough to bootstrap
    /// from, `None` otherwise. Does not install it — the caller (`refine`)
    /// does that once it also holds the sensor lock it needs for the
    /// install.
    pub(super) fn maybe_bootstrap_camera_pose(
        &self,
        device_state: &PerDeviceFrameState,
        observed_object_pose: Pose,
    ) -> Option<Pose> {
        if device_state.gravity_error_rad >= self.config.bootstrap_gravity_threshold_rad {
            return None;
        }
        if device_state.orientation_error_rad >= self.config.bootstrap_orientation_error_rad {
            return None;
        }

        let camera_pose = device_state.capture_world_pose.compose(&observed_object_pose.inverse());

        // Supplemented feature (SPEC_FULL.md §F.1): the reference driver
        // computes this round-trip purely to log it.
        let roundtrip = camera_pose.compose(&observed_object_pose);
        let residual_m = (roundtrip.position - device_state.capture_world_pose.position).norm();
        tracing::trace!(
            sensor = self.id,
            residual_m,
            "camera-pose bootstrap round-trip (world -> camera -> world)"
        );

        Some(camera_pose)
    }
}
