//! End-to-end scenarios driving the full `Tracker`/`Sensor` pipeline
//! against `ext::mock`, the way the teacher's `tests/` directory exercises
//! full-stack behavior rather than individual modules (spec.md §8).

use nalgebra::Vector3;
use rift_camera::{DistortionModel, Intrinsics};
use rift_tracker_core::config::TrackerConfig;
use rift_tracker_core::device::{TrackedDevice, HMD_DEVICE_ID};
use rift_tracker_core::ext::mock::{
    MockBlobWatcher, MockCorrespondenceSearch, MockDebugSinks, MockFusionFilter, MockLedModel,
    MockPnp, MockTransport,
};
use rift_tracker_core::delay_slot::SlotId;
use rift_tracker_core::ext::{FilterEstimate, FusionFilter, LedModel};
use rift_tracker_core::pose::Pose;
use rift_tracker_core::sensor::Sensor;
use rift_tracker_core::tracker::Tracker;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// A fusion filter whose position drifts at a fixed rate with
/// `device_time_ns`, independent of observations — unlike
/// [`MockFusionFilter`]'s constant identity pose, this lets the freeze test
/// tell a frozen position apart from one that's still moving.
#[derive(Default)]
struct DriftingFilter;

impl FusionFilter for DriftingFilter {
    fn imu_update(&mut self, _: u64, _: Vector3<f64>, _: Vector3<f64>) {}
    fn pose_update(&mut self, _: u64, _: &Pose, _: SlotId) {}
    fn position_update(&mut self, _: u64, _: &Vector3<f64>, _: SlotId) {}
    fn prepare_delay_slot(&mut self, _: u64, _: SlotId) {}
    fn release_delay_slot(&mut self, _: SlotId) {}

    fn get_pose_at(&self, device_time_ns: u64) -> FilterEstimate {
        let mut pose = Pose::identity();
        pose.position = Vector3::new(device_time_ns as f64 / 1e9, 0.0, 0.0);
        FilterEstimate {
            pose,
            linear_velocity: Vector3::new(1.0, 0.0, 0.0),
            linear_acceleration: Vector3::zeros(),
            pos_error: Vector3::repeat(0.01),
            rot_error: Vector3::repeat(0.01),
        }
    }
}

fn wait_until(mut pred: impl FnMut() -> bool, timeout: Duration) -> bool {
    let start = Instant::now();
    loop {
        if pred() {
            return true;
        }
        if start.elapsed() > timeout {
            return false;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

fn build_pipeline(
    config: TrackerConfig,
    filter: Box<dyn FusionFilter>,
) -> (Arc<Tracker>, Arc<Sensor>, Arc<TrackedDevice>, Arc<MockTransport>) {
    let tracker = Tracker::new(config.clone());
    let led_model: Arc<dyn LedModel> = Arc::new(MockLedModel::new(8));
    let device = tracker.add_device(
        HMD_DEVICE_ID,
        led_model,
        filter,
        Pose::identity(),
        Some(Box::new(MockDebugSinks)),
    );

    let intrinsics = Intrinsics::new(600.0, 600.0, 320.0, 240.0, [0.0; 5], DistortionModel::Fisheye);
    let transport = Arc::new(MockTransport::new(64, 48));
    let sensor = Sensor::new(
        0,
        intrinsics,
        64,
        48,
        Box::new(Arc::clone(&transport)),
        Box::new(MockBlobWatcher::default()),
        Box::new(MockCorrespondenceSearch),
        Box::new(MockPnp),
        None,
        Arc::downgrade(&tracker),
        config,
    );
    tracker.add_sensor(Arc::clone(&sensor));
    sensor.start().expect("mock transport never fails to start");
    (tracker, sensor, device, transport)
}

/// spec.md §8 "Cold start": the first sufficiently confident HMD
/// observation should bootstrap the sensor's camera pose.
#[test]
fn cold_start_bootstraps_camera_pose_from_first_hmd_observation() {
    let (tracker, sensor, device, transport) =
        build_pipeline(TrackerConfig::default(), Box::new(MockFusionFilter));
    assert!(!sensor.has_camera_pose());

    device.imu_update(0, Vector3::zeros(), Vector3::new(0.0, 9.81, 0.0));
    tracker.update_exposure(0, 0, 1, 0);
    transport.fire_frame(0);

    assert!(
        wait_until(|| sensor.has_camera_pose(), Duration::from_secs(2)),
        "camera pose should bootstrap from the first confident HMD observation"
    );
    sensor.stop().unwrap();
}

/// spec.md §8 "tracking lost": once the last accepted observation is older
/// than `pose_lost_threshold`, `view_pose` freezes position while letting
/// orientation keep integrating.
#[test]
fn tracking_lost_freezes_position_after_threshold() {
    let mut config = TrackerConfig::default();
    config.pose_lost_threshold = Duration::from_millis(20);
    let (tracker, sensor, device, transport) = build_pipeline(config, Box::new(DriftingFilter));

    device.imu_update(0, Vector3::zeros(), Vector3::new(0.0, 9.81, 0.0));
    tracker.update_exposure(0, 0, 1, 0);
    transport.fire_frame(0);
    assert!(wait_until(|| device.time_since_last_observation().is_some(), Duration::from_secs(2)));

    std::thread::sleep(Duration::from_millis(50));
    let frozen_at = device.view_pose(tracker.config()).position;
    device.imu_update(1000, Vector3::zeros(), Vector3::new(0.0, 9.81, 0.0));
    let still_frozen = device.view_pose(tracker.config()).position;
    assert_eq!(frozen_at, still_frozen, "position should stay frozen once tracking is lost");

    sensor.stop().unwrap();
}

/// spec.md §8 "overload": back-to-back exposures arriving faster than the
/// analysis threads can drain them must never deadlock the pipeline —
/// `handle_start_of_frame` reclaims a pending buffer rather than blocking.
#[test]
fn back_to_back_exposures_do_not_deadlock_the_pipeline() {
    let config = TrackerConfig::default();
    let (tracker, sensor, device, transport) =
        build_pipeline(config, Box::new(MockFusionFilter));

    device.imu_update(0, Vector3::zeros(), Vector3::new(0.0, 9.81, 0.0));
    for i in 0..32u16 {
        tracker.update_exposure(u64::from(i) * 1_000_000, u32::from(i) * 1000, i, 0);
        transport.fire_frame(u64::from(i) * 1_000_000);
    }

    assert!(wait_until(|| sensor.has_camera_pose(), Duration::from_secs(2)));
    sensor.stop().unwrap();
}
