//! Long-analysis worker (spec.md §4.3): the two-pass deep combinatorial
//! correspondence search, for devices the fast path couldn't place.

use super::{now_ns, Sensor};
use crate::ext::SearchFlags;
use crate::frame::CaptureFrame;
use nalgebra::Vector3;
use std::collections::HashSet;
use std::sync::Arc;

impl Sensor {
    pub(super) fn long_analysis_loop(self: Arc<Self>) {
        loop {
            let mut frame = {
                let mut state = self.state.lock().unwrap();
                let frame = loop {
                    if state.shutdown {
                        return;
                    }
                    if let Some(f) = state.long_q.pop() {
                        break f;
                    }
                    state = self.cond.wait(state).unwrap();
                };
                state.long_analysis_busy = true;
                frame
            };

            frame.timeline.long_start_ns = Some(now_ns());
            self.deep_search(&mut frame);
            frame.timeline.long_done_ns = Some(now_ns());

            let mut state = self.state.lock().unwrap();
            state.long_analysis_busy = false;
            let released = self.release_capture_frame(&mut state, frame);
            drop(state);
            if let Some(exposure) = released {
                if let Some(tracker) = self.tracker() {
                    tracker.frame_release(&exposure);
                }
            }
        }
    }

    /// Pass 0: shallow search, only strong matches commit. Pass 1: deep
    /// search, good matches commit; devices whose pass-0 acceptance was
    /// invalidated by another device stealing its blobs are re-searched
    /// shallow rather than deep (spec.md §4.3, §8 scenario 5).
    fn deep_search(self: &Arc<Self>, frame: &mut Box<CaptureFrame>) {
        let devices = self.devices.lock().unwrap().clone();
        let camera_pose = self.state.lock().unwrap().camera_pose;
        let gravity_axis = Vector3::y_axis().into_inner();
        let mut shallow_retry: HashSet<usize> = HashSet::new();

        for pass in 0..2u8 {
            for (idx, device) in devices.iter().enumerate() {
                if frame.device_states[idx].found_device_pose {
                    continue;
                }
                let Some(record) =
                    frame.exposure.as_ref().and_then(|e| e.devices.get(idx)).copied()
                else {
                    continue;
                };
                if record.slot().is_none() {
                    continue;
                }

                let flags = if pass == 0 || shallow_retry.contains(&idx) {
                    SearchFlags::SHALLOW | SearchFlags::STOP_FOR_STRONG_MATCH
                } else {
                    SearchFlags::DEEP
                };

                let Some(blobs) = frame.blobs.as_ref() else { continue };
                let relevant: Vec<_> = if device.is_hmd() {
                    blobs.blobs.clone()
                } else {
                    blobs
                        .blobs
                        .iter()
                        .filter(|b| b.label.map_or(true, |(d, _)| d == device.id))
                        .copied()
                        .collect()
                };

                let predicted = frame.device_states[idx].capture_world_pose;
                let mut candidate = match camera_pose {
                    Some(cp) => cp.inverse().compose(&predicted),
                    None => predicted,
                };
                let gravity_error = frame.device_states[idx].gravity_error_rad;
                let use_aligned =
                    camera_pose.is_some() && gravity_error < self.config.aligned_search_gravity_threshold_rad;

                let score = {
                    let mut corr = self.correspondence.lock().unwrap();
                    corr.set_blobs(&relevant);
                    if use_aligned {
                        let (swing, _twist) = candidate.swing_twist(&gravity_axis);
                        let tolerance = (2.0 * gravity_error).max(self.config.aligned_search_min_tolerance_rad);
                        corr.find_one_pose_aligned(
                            device.id,
                            flags,
                            &mut candidate,
                            &gravity_axis,
                            &swing,
                            tolerance,
                        )
                    } else {
                        corr.find_one_pose(device.id, flags, &mut candidate)
                    }
                };

                let accepted = if flags.contains(SearchFlags::SHALLOW) {
                    score.strong_match
                } else {
                    score.good_match
                };
                if !accepted {
                    continue;
                }

                if self.refine_and_submit(frame, device, idx, candidate) {
                    frame.long_analysis_found_new_blobs = true;
                    if let Some(blobs) = frame.blobs.as_ref() {
                        self.blobwatch.lock().unwrap().update_labels(device.id, blobs);
                    }
                }
            }

            if pass == 0 {
                for (idx, device) in devices.iter().enumerate() {
                    if !frame.device_states[idx].found_device_pose {
                        continue;
                    }
                    let Some(blobs) = frame.blobs.as_ref() else { continue };
                    let model = device.led_model();
                    let score = self.pnp.evaluate_pose(
                        &frame.device_states[idx].final_camera_pose,
                        &blobs.blobs,
                        device.id,
                        model.as_ref(),
                        &self.intrinsics,
                    );
                    if !score.good_match {
                        frame.device_states[idx].found_device_pose = false;
                        shallow_retry.insert(idx);
                        tracing::debug!(
                            sensor = self.id,
                            device_id = device.id,
                            "pass-0 acceptance invalidated by blob stealing, re-searching shallow"
                        );
                    }
                }
            }
        }
    }
}
