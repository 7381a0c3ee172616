//! The Tracker (spec.md §2, §4.6): owns the device and sensor collections,
//! synchronizes IMU-driven devices against camera exposures, and allocates
//! delay slots so a delayed visual observation fuses against the correct
//! historical filter state.

use crate::config::TrackerConfig;
use crate::device::TrackedDevice;
use crate::ext::{DebugSinks, FusionFilter, LedModel};
use crate::exposure::{ExposureInfo, PerDeviceExposureRecord, NO_SLOT};
use crate::pose::Pose;
use crate::sensor::Sensor;
use std::sync::{Arc, Mutex};

struct Inner {
    devices: Vec<Arc<TrackedDevice>>,
    sensors: Vec<Arc<Sensor>>,
    exposure_info: Option<ExposureInfo>,
    exposure_counter: u16,
    last_imu_timestamp_ns: Option<u64>,
}

/// Singleton per tracking session (spec.md §2). Created and destroyed
/// explicitly by the caller (spec.md §9, "Global state").
pub struct Tracker {
    config: TrackerConfig,
    inner: Mutex<Inner>,
}

impl Tracker {
    /// Creates an empty tracker (no devices, no sensors).
    #[must_use]
    pub fn new(config: TrackerConfig) -> Arc<Self> {
        Arc::new(Tracker {
            config,
            inner: Mutex::new(Inner {
                devices: Vec::new(),
                sensors: Vec::new(),
                exposure_info: None,
                exposure_counter: 0,
                last_imu_timestamp_ns: None,
            }),
        })
    }

    /// The configuration this tracker was created with.
    #[must_use]
    pub fn config(&self) -> &TrackerConfig {
        &self.config
    }

    /// Registers a new device (spec.md §4.6): allocates the filter and
    /// delay-slot ring, then broadcasts the new device to every sensor so
    /// future frames can be matched against it.
    pub fn add_device(
        self: &Arc<Self>,
        id: u8,
        led_model: Arc<dyn LedModel>,
        filter: Box<dyn FusionFilter>,
        fusion_to_model: Pose,
        _debug_sinks: Option<Box<dyn DebugSinks>>,
    ) -> Arc<TrackedDevice> {
        let device = Arc::new(TrackedDevice::new(id, led_model, filter, fusion_to_model));

        let sensors = {
            let mut inner = self.inner.lock().unwrap();
            assert!(
                inner.devices.len() < self.config.max_tracked_devices,
                "max_tracked_devices exceeded"
            );
            inner.devices.push(Arc::clone(&device));
            inner.sensors.clone()
        };
        for sensor in sensors {
            sensor.add_device(Arc::clone(&device));
        }
        device
    }

    /// Registers a new sensor, handing back its `Arc` so the caller can
    /// start its capture transport.
    pub fn add_sensor(self: &Arc<Self>, sensor: Arc<Sensor>) {
        let devices = {
            let mut inner = self.inner.lock().unwrap();
            inner.sensors.push(Arc::clone(&sensor));
            inner.devices.clone()
        };
        for device in devices {
            sensor.add_device(device);
        }
    }

    /// Snapshot of every registered device.
    #[must_use]
    pub fn devices(&self) -> Vec<Arc<TrackedDevice>> {
        self.inner.lock().unwrap().devices.clone()
    }

    /// The exposure info most recently produced by [`Self::update_exposure`].
    #[must_use]
    pub fn current_exposure_info(&self) -> Option<ExposureInfo> {
        self.inner.lock().unwrap().exposure_info.clone()
    }

    /// Called when an LED-phase edge is detected on the HMD (spec.md §4.6).
    /// If the exposure counter advanced, builds a fresh [`ExposureInfo`]
    /// (allocating a delay slot per device) and notifies every sensor.
    pub fn update_exposure(self: &Arc<Self>, local_timestamp_ns: u64, hmd_timestamp_us: u32, count: u16, led_pattern_phase: u8) {
        let sensors = {
            let mut inner = self.inner.lock().unwrap();
            if inner.exposure_info.as_ref().is_some_and(|e| e.count == count) {
                return;
            }
            inner.exposure_counter = count;

            if let Some(last_imu_ns) = inner.last_imu_timestamp_ns {
                let period_ns = self.config.imu_sample_period.as_nanos() as f64;
                let drift_ns = (local_timestamp_ns as f64) - (last_imu_ns as f64);
                if period_ns > 0.0 && drift_ns > self.config.imu_drift_warn_periods * period_ns {
                    tracing::warn!(
                        drift_ms = drift_ns / 1e6,
                        "exposure timestamp lags latest IMU sample by more than {} IMU periods",
                        self.config.imu_drift_warn_periods
                    );
                }
            }

            let devices: Vec<PerDeviceExposureRecord> = inner
                .devices
                .iter()
                .map(|device| {
                    let device_time_ns = device.device_time_ns();
                    let (slot, filter_estimate) = device.with_slots(|slots, filter| {
                        let slot = slots.update_exposure(filter, device_time_ns);
                        (slot, filter.get_pose_at(device_time_ns))
                    });
                    PerDeviceExposureRecord {
                        device_time_ns,
                        predicted_pose: device.model_pose(&self.config),
                        pos_error: filter_estimate.pos_error,
                        rot_error: filter_estimate.rot_error,
                        fusion_slot: slot.map_or(NO_SLOT, |s| s as i32),
                    }
                })
                .collect();

            inner.exposure_info = Some(ExposureInfo {
                local_timestamp_ns,
                hmd_timestamp_us,
                count,
                led_pattern_phase,
                devices,
            });
            inner.sensors.clone()
        };

        for sensor in sensors {
            sensor.notify_new_exposure();
        }
    }

    /// `frame_start` lifecycle hook (spec.md §4.6): claims each device's
    /// delay slot referenced by `exposure`.
    pub fn frame_start(&self, exposure: Option<&ExposureInfo>) {
        let Some(exposure) = exposure else { return };
        let inner = self.inner.lock().unwrap();
        self.claim_all(&inner.devices, exposure);
    }

    /// `frame_release` lifecycle hook (spec.md §4.6): releases each
    /// device's delay slot referenced by `exposure`. Every `claim` must
    /// eventually balance against exactly one `release`.
    pub fn frame_release(&self, exposure: &ExposureInfo) {
        let inner = self.inner.lock().unwrap();
        self.release_all(&inner.devices, exposure);
    }

    /// `frame_captured` lifecycle hook (spec.md §4.6): no accounting, debug
    /// only.
    pub fn frame_captured(&self, sensor_id: u32, frame_id: usize) {
        tracing::trace!(sensor_id, frame_id, "frame captured");
    }

    /// Exposure patch (spec.md §4.6): a sensor observed a new exposure
    /// arrive within 5ms of start-of-frame, before the prior one's frame
    /// completed. Claims the new exposure's slots before releasing the
    /// old one's, so a slot shared only momentarily is never seen at zero
    /// references in between.
    pub fn exposure_patch(&self, new_exposure: Option<&ExposureInfo>, old_exposure: &ExposureInfo) {
        self.frame_start(new_exposure);
        self.frame_release(old_exposure);
    }

    fn claim_all(&self, devices: &[Arc<TrackedDevice>], exposure: &ExposureInfo) {
        for (device, record) in devices.iter().zip(&exposure.devices) {
            let Some(slot) = record.slot() else { continue };
            let claimed = device.with_slots(|slots, _filter| slots.claim(slot, record.device_time_ns));
            if !claimed {
                tracing::debug!(device_id = device.id, "delay slot lost before claim");
            }
        }
    }

    fn release_all(&self, devices: &[Arc<TrackedDevice>], exposure: &ExposureInfo) {
        for (device, record) in devices.iter().zip(&exposure.devices) {
            let Some(slot) = record.slot() else { continue };
            device.with_slots(|slots, filter| slots.release(filter, slot));
        }
    }
}
