//! Fast-analysis worker (spec.md §4.2): cheap reacquire from the last known
//! pose, falling back to a PnP-on-still-labeled-blobs retry before handing
//! off to the long (deep search) path.

use super::{now_ns, Sensor};
use crate::frame::CaptureFrame;
use std::sync::Arc;

impl Sensor {
    pub(super) fn fast_analysis_loop(self: Arc<Self>) {
        loop {
            let mut frame = {
                let mut state = self.state.lock().unwrap();
                loop {
                    if state.shutdown {
                        return;
                    }
                    if let Some(f) = state.fast_q.pop() {
                        break f;
                    }
                    state = self.cond.wait(state).unwrap();
                }
            };

            frame.timeline.fast_start_ns = Some(now_ns());
            self.analyse_frame_fast(&mut frame);
            frame.timeline.fast_done_ns = Some(now_ns());

            let mut state = self.state.lock().unwrap();
            let released = if frame.need_long_analysis && !state.long_analysis_busy {
                let stale_released =
                    state.long_q.rewind().and_then(|stale| self.release_capture_frame(&mut state, stale));
                state.long_q.push(frame);
                self.cond.notify_all();
                stale_released
            } else {
                self.release_capture_frame(&mut state, frame)
            };
            drop(state);
            if let Some(exposure) = released {
                if let Some(tracker) = self.tracker() {
                    tracker.frame_release(&exposure);
                }
            }
        }
    }

    /// Blob extraction plus, for every device with a live delay slot, the
    /// cheap reacquire-from-prior-pose path (spec.md §4.2 steps 1-6).
    fn analyse_frame_fast(self: &Arc<Self>, frame: &mut Box<CaptureFrame>) {
        let phase = frame.exposure.as_ref().map_or(0, |e| e.led_pattern_phase);
        let image = self.transport.lock().unwrap().buffer(frame.id).to_vec();
        let observation =
            self.blobwatch.lock().unwrap().process(&image, self.image_width, self.image_height, phase);
        frame.timeline.blob_done_ns = Some(now_ns());
        frame.blobs = Some(observation);

        let devices = self.devices.lock().unwrap().clone();
        let camera_pose = self.state.lock().unwrap().camera_pose;

        for (idx, device) in devices.iter().enumerate() {
            let Some(record) = frame.exposure.as_ref().and_then(|e| e.devices.get(idx)).copied() else {
                continue;
            };
            if record.slot().is_none() {
                continue;
            }

            let predicted = frame.device_states[idx].capture_world_pose;
            let expected_camera_pose = match camera_pose {
                Some(camera_pose) => camera_pose.inverse().compose(&predicted),
                None => predicted,
            };

            let model = Arc::clone(device.led_model());
            let blobs = &frame.blobs.as_ref().unwrap().blobs;
            let mut candidate = expected_camera_pose;
            let mut score = self.pnp.evaluate_pose_with_prior(
                &candidate,
                &expected_camera_pose,
                &record.pos_error,
                &record.rot_error,
                blobs,
                device.id,
                model.as_ref(),
                &self.intrinsics,
            );

            let mut accepted = score.good_match;
            if !accepted {
                let labeled = frame.blobs.as_ref().unwrap().labeled_for(device.id).count();
                if labeled > self.config.reacquire_min_labeled_blobs {
                    let blobs = &frame.blobs.as_ref().unwrap().blobs;
                    if let Some(pose) = self.pnp.estimate_initial_pose(
                        blobs,
                        device.id,
                        model.as_ref(),
                        &self.intrinsics,
                        false,
                    ) {
                        candidate = pose;
                        let blobs = &frame.blobs.as_ref().unwrap().blobs;
                        score = self.pnp.evaluate_pose(
                            &candidate,
                            blobs,
                            device.id,
                            model.as_ref(),
                            &self.intrinsics,
                        );
                        accepted = score.good_match;
                    }
                }
            }

            if !accepted {
                frame.need_long_analysis = true;
                continue;
            }

            if !self.refine_and_submit(frame, device, idx, candidate) {
                frame.need_long_analysis = true;
            }
        }
    }
}
