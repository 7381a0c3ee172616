//! Tracker configuration.
//!
//! The reference driver hardcodes these as preprocessor macros; here they're
//! fields on a serde-friendly struct the caller builds (from a file, CLI
//! flags, or [`TrackerConfig::default`]) and hands to
//! [`crate::tracker::Tracker::new`]. Nothing here is persisted by this
//! crate (spec.md Non-goals) — that's the caller's concern.

use eyre::Context;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Number of delay slots kept per tracked device (spec.md §3, `K=3`).
pub const NUM_DELAY_SLOTS: usize = 3;

/// Size of a sensor's fixed capture-buffer pool (spec.md §3).
pub const NUM_CAPTURE_BUFFERS: usize = 4;

/// Tunables for a [`crate::tracker::Tracker`] session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Upper bound on the number of devices a tracker will register.
    pub max_tracked_devices: usize,

    /// Number of frame buffers each sensor's capture pool holds.
    pub num_capture_buffers: usize,

    /// Above this age, `view_pose` freezes position and lets only
    /// orientation continue to integrate IMU (spec.md §4.8).
    pub pose_lost_threshold: Duration,

    /// Gravity-uncertainty threshold (radians) below which the camera-pose
    /// bootstrap (spec.md §4.5) is allowed to fire.
    pub bootstrap_gravity_threshold_rad: f64,

    /// Full-orientation uncertainty threshold (radians) below which the
    /// HMD's capture orientation is trusted enough to bootstrap from. The
    /// reference driver checks the un-normalized filter quaternion's
    /// magnitude (`|q| > 0.9`) as a proxy for "the filter has actually
    /// initialized orientation"; since this crate's `UnitQuaternion` is
    /// always unit norm by construction, that signal is re-expressed here
    /// as a bound on the filter's reported rotational uncertainty.
    pub bootstrap_orientation_error_rad: f64,

    /// Gravity-uncertainty threshold (radians) below which the deep search
    /// (spec.md §4.3) uses an aligned, swing-constrained search instead of
    /// an unconstrained one.
    pub aligned_search_gravity_threshold_rad: f64,

    /// Minimum swing tolerance (radians) passed to an aligned search,
    /// regardless of how tight the gravity estimate is (spec.md §4.3,
    /// `max(2*sigma, 10 deg)`).
    pub aligned_search_min_tolerance_rad: f64,

    /// Minimum number of still-labeled blobs required before a reacquire
    /// candidate's label count is treated as trustworthy (spec.md §4.2
    /// step 4, "if > 4").
    pub reacquire_min_labeled_blobs: usize,

    /// Feed only position, not full pose, into the fusion filter
    /// (`FusionFilter::position_update` instead of `pose_update`) — the
    /// runtime equivalent of the reference driver's `SENSORS_POSITION_ONLY`
    /// compile-time toggle. See `SPEC_FULL.md` §F.2.
    pub position_only: bool,

    /// Exposure/IMU drift warning threshold, expressed as a multiple of the
    /// nominal IMU sample period (`SPEC_FULL.md` §F.4).
    pub imu_drift_warn_periods: f64,

    /// Nominal IMU sample period, used to scale `imu_drift_warn_periods`.
    pub imu_sample_period: Duration,
}

impl TrackerConfig {
    /// Loads a config from a JSON file, falling back to
    /// [`TrackerConfig::default`] for any field the file omits (`#[serde(default)]`).
    pub fn load_from_file(path: impl AsRef<Path>) -> eyre::Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .wrap_err_with(|| format!("reading config from {}", path.display()))?;
        serde_json::from_str(&contents)
            .wrap_err_with(|| format!("parsing config at {}", path.display()))
    }

    /// Writes this config to a JSON file, creating parent directories as
    /// needed. The caller decides where and when to call this (spec.md
    /// Non-goals: this crate persists nothing on its own).
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> eyre::Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .wrap_err_with(|| format!("creating {}", parent.display()))?;
        }
        let json = serde_json::to_string_pretty(self).wrap_err("serializing config")?;
        std::fs::write(path, json).wrap_err_with(|| format!("writing config to {}", path.display()))
    }
}

impl Default for TrackerConfig {
    fn default() -> Self {
        TrackerConfig {
            max_tracked_devices: 5,
            num_capture_buffers: NUM_CAPTURE_BUFFERS,
            pose_lost_threshold: Duration::from_millis(500),
            bootstrap_gravity_threshold_rad: 15f64.to_radians(),
            bootstrap_orientation_error_rad: 25f64.to_radians(),
            aligned_search_gravity_threshold_rad: 45f64.to_radians(),
            aligned_search_min_tolerance_rad: 10f64.to_radians(),
            reacquire_min_labeled_blobs: 4,
            position_only: false,
            imu_drift_warn_periods: 1.5,
            imu_sample_period: Duration::from_millis(1),
        }
    }
}
