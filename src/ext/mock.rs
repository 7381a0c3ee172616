//! In-memory stand-ins for every external trait seam in this module, plus a
//! no-op [`rift_camera::Transport`]. Used by the demo binary and by the
//! integration tests under `tests/` to drive the pipeline without real
//! hardware or vendor SDKs.

use super::{
    Blob, BlobObservation, BlobWatcher, CorrespondenceSearch, DebugSinks, FilterEstimate,
    FusionFilter, Gravity, LedModel, Pnp, PoseMetrics, SearchFlags,
};
use crate::delay_slot::SlotId;
use crate::pose::Pose;
use nalgebra::{UnitQuaternion, Vector3};
use rift_camera::{FrameId, Intrinsics, Transport, TransportSink};
use std::sync::{Arc, Mutex};

/// A constellation of `n` LEDs arranged on a unit sphere, evenly spaced by
/// angle — enough geometry for the mock correspondence/PnP pair to reason
/// about without modeling a real device.
pub struct MockLedModel {
    positions: Vec<Vector3<f64>>,
    normals: Vec<Vector3<f64>>,
}

impl MockLedModel {
    /// Builds a model with `n` LEDs.
    #[must_use]
    pub fn new(n: usize) -> Self {
        let mut positions = Vec::with_capacity(n);
        let mut normals = Vec::with_capacity(n);
        for i in 0..n {
            let theta = (i as f64 / n as f64) * std::f64::consts::TAU;
            let p = Vector3::new(theta.cos(), theta.sin(), 0.0);
            positions.push(p);
            normals.push(p);
        }
        MockLedModel { positions, normals }
    }
}

impl LedModel for MockLedModel {
    fn led_positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    fn led_normals(&self) -> &[Vector3<f64>] {
        &self.normals
    }
}

/// A blob watcher that returns whatever observation was queued for it via
/// [`MockBlobWatcher::push`], or an empty one otherwise.
#[derive(Default)]
pub struct MockBlobWatcher {
    queued: std::collections::VecDeque<BlobObservation>,
}

impl MockBlobWatcher {
    /// Queues the observation the next [`BlobWatcher::process`] call
    /// returns.
    pub fn push(&mut self, observation: BlobObservation) {
        self.queued.push_back(observation);
    }
}

impl BlobWatcher for MockBlobWatcher {
    fn process(&mut self, _image: &[u8], _width: u32, _height: u32, _led_pattern_phase: u8) -> BlobObservation {
        self.queued.pop_front().unwrap_or_default()
    }

    fn update_labels(&mut self, _device_id: u8, _observation: &BlobObservation) {}
}

/// A correspondence search that always reports the pose it's told to search
/// around as a strong match, without perturbing it. Exercises pipeline
/// control flow, not real geometry.
#[derive(Default)]
pub struct MockCorrespondenceSearch;

impl CorrespondenceSearch for MockCorrespondenceSearch {
    fn set_model(&mut self, _device_id: u8, _model: Arc<dyn LedModel>) {}

    fn set_blobs(&mut self, _blobs: &[Blob]) {}

    fn find_one_pose(&mut self, _device_id: u8, _flags: SearchFlags, _pose: &mut Pose) -> PoseMetrics {
        PoseMetrics { visible_leds: 1, matched_blobs: 1, good_match: true, strong_match: true }
    }

    fn find_one_pose_aligned(
        &mut self,
        _device_id: u8,
        _flags: SearchFlags,
        _pose: &mut Pose,
        _gravity: &Gravity,
        _prior_swing: &UnitQuaternion<f64>,
        _tolerance_rad: f64,
    ) -> PoseMetrics {
        PoseMetrics { visible_leds: 1, matched_blobs: 1, good_match: true, strong_match: true }
    }
}

/// A PnP solver that passes the candidate pose through unchanged and always
/// scores it as a good match.
#[derive(Default)]
pub struct MockPnp;

impl Pnp for MockPnp {
    fn estimate_initial_pose(
        &self,
        _blobs: &[Blob],
        _device_id: u8,
        _model: &dyn LedModel,
        _intrinsics: &Intrinsics,
        _refine_extrinsic: bool,
    ) -> Option<Pose> {
        Some(Pose::identity())
    }

    fn mark_matching_blobs(
        &self,
        _pose: &Pose,
        _blobs: &mut [Blob],
        _device_id: u8,
        _model: &dyn LedModel,
        _intrinsics: &Intrinsics,
    ) {
    }

    fn evaluate_pose(
        &self,
        _pose: &Pose,
        _blobs: &[Blob],
        _device_id: u8,
        _model: &dyn LedModel,
        _intrinsics: &Intrinsics,
    ) -> PoseMetrics {
        PoseMetrics { visible_leds: 1, matched_blobs: 1, good_match: true, strong_match: true }
    }

    fn evaluate_pose_with_prior(
        &self,
        pose: &Pose,
        _prior: &Pose,
        _pos_error: &Vector3<f64>,
        _rot_error: &Vector3<f64>,
        blobs: &[Blob],
        device_id: u8,
        model: &dyn LedModel,
        intrinsics: &Intrinsics,
    ) -> PoseMetrics {
        self.evaluate_pose(pose, blobs, device_id, model, intrinsics)
    }
}

/// A fusion filter that holds the identity pose and never moves — enough to
/// exercise slot bookkeeping without a real IMU/vision filter.
#[derive(Default)]
pub struct MockFusionFilter;

impl FusionFilter for MockFusionFilter {
    fn imu_update(&mut self, _device_time_ns: u64, _angular_velocity: Vector3<f64>, _linear_acceleration: Vector3<f64>) {}

    fn pose_update(&mut self, _device_time_ns: u64, _pose: &Pose, _slot: SlotId) {}

    fn position_update(&mut self, _device_time_ns: u64, _position: &Vector3<f64>, _slot: SlotId) {}

    fn prepare_delay_slot(&mut self, _device_time_ns: u64, _slot: SlotId) {}

    fn release_delay_slot(&mut self, _slot: SlotId) {}

    fn get_pose_at(&self, _device_time_ns: u64) -> FilterEstimate {
        FilterEstimate {
            pose: Pose::identity(),
            linear_velocity: Vector3::zeros(),
            linear_acceleration: Vector3::zeros(),
            pos_error: Vector3::repeat(0.01),
            rot_error: Vector3::repeat(0.01),
        }
    }
}

/// [`DebugSinks`] that drops everything; the default no-op bodies already
/// do this, so this exists only to name the type at call sites.
#[derive(Default)]
pub struct MockDebugSinks;

impl DebugSinks for MockDebugSinks {}

/// A [`Transport`] with no real stream: `start`/`stop` are no-ops, and
/// [`MockTransport::fire_frame`] lets a test or demo drive the sink
/// callbacks directly.
#[derive(Default)]
pub struct MockTransport {
    sink: Mutex<Option<Arc<dyn TransportSink>>>,
    frame: Mutex<FrameId>,
    buffer: Vec<u8>,
}

impl MockTransport {
    /// Builds a transport whose single buffer is `width * height` zeroed
    /// bytes.
    #[must_use]
    pub fn new(width: u32, height: u32) -> Self {
        MockTransport {
            sink: Mutex::new(None),
            frame: Mutex::new(0),
            buffer: vec![0u8; (width * height) as usize],
        }
    }

    /// Fires an SOF followed immediately by an EOF for the currently
    /// published frame id.
    pub fn fire_frame(&self, start_time_ns: u64) {
        let sink = self.sink.lock().unwrap().clone();
        let Some(sink) = sink else { return };
        sink.on_start_of_frame(start_time_ns);
        sink.on_frame_complete(*self.frame.lock().unwrap());
    }
}

impl Transport for MockTransport {
    fn set_sink(&mut self, sink: Arc<dyn TransportSink>) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn start(&mut self) -> eyre::Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> eyre::Result<()> {
        Ok(())
    }

    fn clear(&mut self) {}

    fn set_frame(&mut self, frame_id: FrameId) {
        *self.frame.lock().unwrap() = frame_id;
    }

    fn buffer(&self, _frame_id: FrameId) -> &[u8] {
        &self.buffer
    }
}

/// Same as the inherent [`Transport`] impl, but on a shared handle: lets a
/// caller hand a `Box<dyn Transport>` to [`crate::sensor::Sensor::new`]
/// while keeping an `Arc<MockTransport>` of its own to call
/// [`MockTransport::fire_frame`] from outside the pipeline (demo binary,
/// integration tests).
impl Transport for Arc<MockTransport> {
    fn set_sink(&mut self, sink: Arc<dyn TransportSink>) {
        *self.sink.lock().unwrap() = Some(sink);
    }

    fn start(&mut self) -> eyre::Result<()> {
        Ok(())
    }

    fn stop(&mut self) -> eyre::Result<()> {
        Ok(())
    }

    fn clear(&mut self) {}

    fn set_frame(&mut self, frame_id: FrameId) {
        *self.frame.lock().unwrap() = frame_id;
    }

    fn buffer(&self, _frame_id: FrameId) -> &[u8] {
        &self.buffer
    }
}
