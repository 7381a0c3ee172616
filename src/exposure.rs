//! Exposure-info records: the Tracker's notification of an LED pattern
//! phase edge, and the per-device snapshot carried with it (spec.md §3).

use crate::delay_slot::SlotId;
use crate::pose::Pose;
use nalgebra::Vector3;

/// Sentinel stored in [`PerDeviceExposureRecord::fusion_slot`] when no delay
/// slot was available at exposure time, or when a previously-claimed slot
/// was lost (spec.md §4.7).
pub const NO_SLOT: i32 = -1;

/// Per-device state captured into an [`ExposureInfo`] at the moment it's
/// created (spec.md §3).
#[derive(Debug, Clone, Copy)]
pub struct PerDeviceExposureRecord {
    /// Device-time at exposure.
    pub device_time_ns: u64,
    /// Predicted pose at that time, copied out of the fusion filter.
    pub predicted_pose: Pose,
    /// Positional uncertainty (standard deviation per axis).
    pub pos_error: Vector3<f64>,
    /// Rotational uncertainty (standard deviation per axis).
    pub rot_error: Vector3<f64>,
    /// The allocated delay slot, or [`NO_SLOT`].
    pub fusion_slot: i32,
}

impl PerDeviceExposureRecord {
    /// The allocated slot, if any.
    #[must_use]
    pub fn slot(&self) -> Option<SlotId> {
        usize::try_from(self.fusion_slot).ok()
    }

    /// Gravity uncertainty (spec.md GLOSSARY): the standard deviation of
    /// the orientation estimate about the axes orthogonal to gravity,
    /// derived from the X/Z components of `rot_error`.
    #[must_use]
    pub fn gravity_error_rad(&self) -> f64 {
        (self.rot_error.x.powi(2) + self.rot_error.z.powi(2)).sqrt()
    }
}

/// Produced by the Tracker on every LED phase change (spec.md §3).
#[derive(Debug, Clone)]
pub struct ExposureInfo {
    /// Monotonic local timestamp of the exposure edge.
    pub local_timestamp_ns: u64,
    /// HMD-reported timestamp of the edge (wrapping 32-bit microseconds,
    /// as received).
    pub hmd_timestamp_us: u32,
    /// 16-bit exposure counter, wraps.
    pub count: u16,
    /// LED pattern phase index, `0..P`.
    pub led_pattern_phase: u8,
    /// One record per device registered at the moment this was created.
    pub devices: Vec<PerDeviceExposureRecord>,
}

impl ExposureInfo {
    /// Number of devices this exposure was created against.
    #[must_use]
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }
}
