//! Refine-and-submit (spec.md §4.4): shared by the fast-reacquire and
//! long-search paths. Tightens a candidate camera-relative pose with PnP,
//! relabels blobs, and — if it still scores well — submits it to the
//! device's fusion filter.

use super::Sensor;
use crate::device::TrackedDevice;
use crate::frame::CaptureFrame;
use crate::pose::Pose;
use std::sync::Arc;

impl Sensor {
    /// Returns `true` if the candidate was accepted and submitted.
    pub(super) fn refine_and_submit(
        self: &Arc<Self>,
        frame: &mut CaptureFrame,
        device: &Arc<TrackedDevice>,
        device_idx: usize,
        mut candidate: Pose,
    ) -> bool {
        let model = Arc::clone(device.led_model());
        let Some(observation) = frame.blobs.as_mut() else { return false };

        for blob in observation.blobs.iter_mut() {
            if blob.label.is_some_and(|(d, _)| d == device.id) {
                blob.previous_label = blob.label;
                blob.label = None;
            }
        }

        self.pnp.mark_matching_blobs(
            &candidate,
            &mut observation.blobs,
            device.id,
            model.as_ref(),
            &self.intrinsics,
        );

        let Some(refined) = self.pnp.estimate_initial_pose(
            &observation.blobs,
            device.id,
            model.as_ref(),
            &self.intrinsics,
            true,
        ) else {
            return false;
        };
        candidate = refined;

        self.pnp.mark_matching_blobs(
            &candidate,
            &mut observation.blobs,
            device.id,
            model.as_ref(),
            &self.intrinsics,
        );
        let score = self.pnp.evaluate_pose(
            &candidate,
            &observation.blobs,
            device.id,
            model.as_ref(),
            &self.intrinsics,
        );
        frame.device_states[device_idx].score = score;
        if !score.good_match {
            return false;
        }

        let mut camera_pose = self.state.lock().unwrap().camera_pose;
        if camera_pose.is_none() && device.is_hmd() {
            if let Some(bootstrapped) =
                self.maybe_bootstrap_camera_pose(&frame.device_states[device_idx], candidate)
            {
                self.state.lock().unwrap().camera_pose = Some(bootstrapped);
                camera_pose = Some(bootstrapped);
                tracing::info!(sensor = self.id, "camera pose bootstrapped from HMD observation");
            }
        }

        let Some(camera_pose) = camera_pose else {
            // No camera pose yet and this observation didn't bootstrap one
            // (not the HMD, or confidence too low) — can't place the
            // device in world space this frame (spec.md §4.5, "Bootstrap
            // failure").
            frame.device_states[device_idx].final_camera_pose = candidate;
            return false;
        };

        let mut world_pose = camera_pose.compose(&candidate);
        if device.is_hmd() {
            world_pose = world_pose.mirror_xz();
        }

        frame.device_states[device_idx].final_camera_pose = candidate;
        frame.device_states[device_idx].found_device_pose = true;

        let Some(record) =
            frame.exposure.as_ref().and_then(|e| e.devices.get(device_idx)).copied()
        else {
            return true;
        };
        let Some(slot) = record.slot() else { return true };

        device.with_slots(|_slots, filter| {
            if self.config.position_only {
                filter.position_update(record.device_time_ns, &world_pose.position, slot);
            } else {
                filter.pose_update(record.device_time_ns, &world_pose, slot);
            }
        });
        device.record_observed_pose(record.device_time_ns, world_pose);

        true
    }
}
