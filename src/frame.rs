//! Capture-frame state (spec.md §3): the unit of ownership handed between
//! pipeline stages. A frame is always owned by exactly one stage at a time
//! — queue hand-off is a move, never a shared reference (spec.md §9).

use crate::exposure::ExposureInfo;
use crate::ext::{BlobObservation, PoseMetrics};
use crate::pose::Pose;
use rift_camera::FrameId;

/// Per-device state mirrored into a [`CaptureFrame`] from the exposure
/// record at end-of-frame, then refined by analysis (spec.md §3).
#[derive(Debug, Clone)]
pub struct PerDeviceFrameState {
    /// World pose at capture time, copied from the fusion filter via the
    /// delay slot.
    pub capture_world_pose: Pose,
    /// Gravity uncertainty (radians) at capture time, derived from the
    /// X/Z components of the rotational error.
    pub gravity_error_rad: f64,
    /// Full rotational uncertainty (radians, all three axes) at capture
    /// time. Used by the bootstrap orientation-confidence check
    /// (`SPEC_FULL.md`, Open Questions) in place of the reference driver's
    /// un-normalized-quaternion-magnitude check.
    pub orientation_error_rad: f64,
    /// Final camera-relative pose determined by analysis, once found.
    pub final_camera_pose: Pose,
    /// Pose-quality score for `final_camera_pose`.
    pub score: PoseMetrics,
    /// Short-circuits the long search once fast analysis (or an earlier
    /// long-search pass) has already placed this device in this frame.
    pub found_device_pose: bool,
}

impl Default for PerDeviceFrameState {
    fn default() -> Self {
        PerDeviceFrameState {
            capture_world_pose: Pose::identity(),
            gravity_error_rad: f64::MAX,
            orientation_error_rad: f64::MAX,
            final_camera_pose: Pose::identity(),
            score: PoseMetrics::default(),
            found_device_pose: false,
        }
    }
}

/// Timestamps (monotonic local nanoseconds) marking a frame's progress
/// through the pipeline, used both for the overload/backpressure invariant
/// and for the per-frame timing breadcrumb log (`SPEC_FULL.md` §F.3).
#[derive(Debug, Clone, Copy, Default)]
pub struct FrameTimeline {
    /// USB/capture delivery (end-of-frame callback).
    pub delivered_ns: Option<u64>,
    /// Fast-analysis worker picked up the frame.
    pub fast_start_ns: Option<u64>,
    /// Blob extraction finished.
    pub blob_done_ns: Option<u64>,
    /// Fast analysis finished (device loop done).
    pub fast_done_ns: Option<u64>,
    /// Long-analysis worker picked up the frame.
    pub long_start_ns: Option<u64>,
    /// Long analysis finished.
    pub long_done_ns: Option<u64>,
}

/// A single pool slot, owned by exactly one pipeline stage at a time
/// (spec.md §3, §9).
#[derive(Debug)]
pub struct CaptureFrame {
    /// Index into the sensor's fixed buffer pool; also the
    /// [`rift_camera::Transport`] frame id.
    pub id: FrameId,
    /// Exposure this capture was stamped with, if any (SOF glitches can
    /// leave this unset; spec.md §4.2 end-of-frame step 2).
    pub exposure: Option<ExposureInfo>,
    /// Blobs extracted from this frame's image, once fast analysis runs.
    pub blobs: Option<BlobObservation>,
    /// Per-device state, parallel to `exposure`'s device records.
    pub device_states: Vec<PerDeviceFrameState>,
    /// Progress timestamps, used for the overload invariant and the timing
    /// breadcrumb log.
    pub timeline: FrameTimeline,
    /// Set by fast analysis when at least one device still needs the long
    /// search.
    pub need_long_analysis: bool,
    /// Set by the long worker when it accepts a pose that may have stolen
    /// blobs another device's already-accepted pose relied on.
    pub long_analysis_found_new_blobs: bool,
}

impl CaptureFrame {
    /// Creates an empty frame for pool slot `id`.
    #[must_use]
    pub fn new(id: FrameId) -> Self {
        CaptureFrame {
            id,
            exposure: None,
            blobs: None,
            device_states: Vec::new(),
            timeline: FrameTimeline::default(),
            need_long_analysis: false,
            long_analysis_found_new_blobs: false,
        }
    }

    /// Resets all per-capture state so the buffer can be reused for the
    /// next exposure, without reallocating `device_states`' backing
    /// storage.
    pub fn reset(&mut self) {
        self.exposure = None;
        self.blobs = None;
        self.device_states.clear();
        self.timeline = FrameTimeline::default();
        self.need_long_analysis = false;
        self.long_analysis_found_new_blobs = false;
    }
}
