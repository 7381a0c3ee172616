//! Tracked device state (spec.md §3, §4.8): one entry per HMD/controller,
//! holding its LED geometry, fusion filter, delay slots, and pose-output
//! smoothing.

use crate::config::TrackerConfig;
use crate::delay_slot::DelaySlotRing;
use crate::ext::{FusionFilter, LedModel};
use crate::pose::{Pose, SmoothedPose};
use nalgebra::Vector3;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// Device id reserved for the HMD (spec.md §3).
pub const HMD_DEVICE_ID: u8 = 0;

/// One raw IMU sample buffered before it's been folded into the device's
/// monotonic device-time (spec.md §3, "a pending IMU observation buffer").
/// Mostly diagnostic: by the time `imu_update` returns, the sample has
/// already been forwarded to the fusion filter.
#[derive(Debug, Clone, Copy)]
pub struct ImuSample {
    /// Device-reported timestamp, wrapping 32-bit microseconds.
    pub raw_timestamp_us: u32,
    /// Angular velocity, rad/s, device frame.
    pub angular_velocity: Vector3<f64>,
    /// Linear acceleration, m/s^2, device frame.
    pub linear_acceleration: Vector3<f64>,
}

const PENDING_IMU_CAPACITY: usize = 16;

/// Extends a wrapping 32-bit microsecond device timestamp into a
/// monotonically non-decreasing nanosecond counter (spec.md §3 invariant).
#[derive(Debug, Default)]
struct DeviceTimeExtender {
    last_raw_us: u32,
    extended_us: u64,
    initialized: bool,
}

impl DeviceTimeExtender {
    fn extend(&mut self, raw_us: u32) -> u64 {
        if !self.initialized {
            self.initialized = true;
            self.last_raw_us = raw_us;
            self.extended_us = u64::from(raw_us);
            return self.extended_us * 1000;
        }
        let delta = raw_us.wrapping_sub(self.last_raw_us);
        self.last_raw_us = raw_us;
        self.extended_us += u64::from(delta);
        self.extended_us * 1000
    }
}

struct Inner {
    filter: Box<dyn FusionFilter>,
    delay_slots: DelaySlotRing,
    time: DeviceTimeExtender,
    device_time_ns: u64,
    pending_imu: Vec<ImuSample>,
    last_observed_pose: Pose,
    last_observed_pose_time_ns: u64,
    last_observed_at: Option<Instant>,
    output_smoother: SmoothedPose,
}

/// A registered device: id, immutable LED geometry and fusion-to-model
/// offset, and the mutable filter/delay-slot/output state behind a mutex
/// (spec.md §5, "per-device mutex guards the filter, the delay-slot ring,
/// pending IMU observations, last-observed pose, and output smoother").
pub struct TrackedDevice {
    /// Small integer id; `0` is the HMD (spec.md §3).
    pub id: u8,
    led_model: Arc<dyn LedModel>,
    fusion_to_model: Pose,
    inner: Mutex<Inner>,
}

impl TrackedDevice {
    /// Registers a new device (spec.md §4.6): allocates the delay-slot ring
    /// and wraps the caller-supplied filter and LED geometry.
    pub fn new(
        id: u8,
        led_model: Arc<dyn LedModel>,
        filter: Box<dyn FusionFilter>,
        fusion_to_model: Pose,
    ) -> Self {
        TrackedDevice {
            id,
            led_model,
            fusion_to_model,
            inner: Mutex::new(Inner {
                filter,
                delay_slots: DelaySlotRing::new(),
                time: DeviceTimeExtender::default(),
                device_time_ns: 0,
                pending_imu: Vec::with_capacity(PENDING_IMU_CAPACITY),
                last_observed_pose: Pose::identity(),
                last_observed_pose_time_ns: 0,
                last_observed_at: None,
                output_smoother: SmoothedPose::new(1.0),
            }),
        }
    }

    /// The device's LED constellation geometry.
    #[must_use]
    pub fn led_model(&self) -> &Arc<dyn LedModel> {
        &self.led_model
    }

    /// `true` if this is the HMD.
    #[must_use]
    pub fn is_hmd(&self) -> bool {
        self.id == HMD_DEVICE_ID
    }

    /// Integrates one IMU sample, extending its wrapping 32-bit microsecond
    /// timestamp into the device's monotonic `device_time_ns` and
    /// forwarding it to the fusion filter.
    pub fn imu_update(&self, raw_timestamp_us: u32, angular_velocity: Vector3<f64>, linear_acceleration: Vector3<f64>) {
        let mut inner = self.inner.lock().unwrap();
        let device_time_ns = inner.time.extend(raw_timestamp_us);
        inner.device_time_ns = device_time_ns;
        if inner.pending_imu.len() == PENDING_IMU_CAPACITY {
            inner.pending_imu.remove(0);
        }
        inner.pending_imu.push(ImuSample { raw_timestamp_us, angular_velocity, linear_acceleration });
        inner.filter.imu_update(device_time_ns, angular_velocity, linear_acceleration);
    }

    /// Current monotonic device-time, last established by `imu_update`.
    #[must_use]
    pub fn device_time_ns(&self) -> u64 {
        self.inner.lock().unwrap().device_time_ns
    }

    /// Runs `f` with exclusive access to the delay-slot ring and fusion
    /// filter together, the only way either should be touched (spec.md
    /// §4.7: slot operations always go through the filter in lockstep).
    pub fn with_slots<R>(&self, f: impl FnOnce(&mut DelaySlotRing, &mut dyn FusionFilter) -> R) -> R {
        let mut inner = self.inner.lock().unwrap();
        let Inner { delay_slots, filter, .. } = &mut *inner;
        f(delay_slots, filter.as_mut())
    }

    /// Records a freshly accepted observation, used by `view_pose`'s
    /// tracking-lost freeze (spec.md §4.8).
    pub fn record_observed_pose(&self, device_time_ns: u64, world_pose: Pose) {
        let mut inner = self.inner.lock().unwrap();
        inner.last_observed_pose = world_pose;
        inner.last_observed_pose_time_ns = device_time_ns;
        inner.last_observed_at = Some(Instant::now());
    }

    /// The pose reported to the application (spec.md §4.8): queries the
    /// filter at the current device-time, smooths it, and freezes position
    /// (while still letting orientation integrate) once the last observed
    /// pose is older than `config.pose_lost_threshold`.
    pub fn view_pose(&self, config: &TrackerConfig) -> Pose {
        let mut inner = self.inner.lock().unwrap();
        let device_time_ns = inner.device_time_ns;
        let estimate = inner.filter.get_pose_at(device_time_ns);
        let mut raw = estimate.pose;

        let frozen = inner
            .last_observed_at
            .is_some_and(|t| t.elapsed() > config.pose_lost_threshold);
        if frozen {
            raw.position = inner.output_smoother.current().position;
        }

        inner.output_smoother.update(device_time_ns, raw)
    }

    /// The pose used when building an exposure record (spec.md §4.8): like
    /// `view_pose`, but composed with the device's fusion-to-model offset
    /// and, for the HMD, passed through the axis-convention mirror.
    #[must_use]
    pub fn model_pose(&self, config: &TrackerConfig) -> Pose {
        let view = self.view_pose(config);
        let model = view.compose(&self.fusion_to_model);
        if self.is_hmd() {
            model.mirror_xz()
        } else {
            model
        }
    }

    /// Age of the last accepted observation, or `None` if one has never
    /// been recorded.
    #[must_use]
    pub fn time_since_last_observation(&self) -> Option<Duration> {
        self.inner.lock().unwrap().last_observed_at.map(|t| t.elapsed())
    }
}
