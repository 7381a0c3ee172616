//! Wires mock implementations of every external trait seam together and
//! drives a handful of synthetic exposures through the pipeline, so the
//! tracker can be smoke-run without real hardware (`SPEC_FULL.md` §A).

#![warn(clippy::pedantic)]

use clap::Parser;
use eyre::Result;
use nalgebra::Vector3;
use rift_camera::{DistortionModel, Intrinsics};
use rift_tracker_core::config::TrackerConfig;
use rift_tracker_core::device::HMD_DEVICE_ID;
use rift_tracker_core::ext::mock::{
    MockBlobWatcher, MockCorrespondenceSearch, MockDebugSinks, MockFusionFilter, MockLedModel,
    MockPnp, MockTransport,
};
use rift_tracker_core::ext::LedModel;
use rift_tracker_core::pose::Pose;
use rift_tracker_core::sensor::Sensor;
use rift_tracker_core::tracker::Tracker;
use rift_tracker_core::logger;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Runs a handful of synthetic exposures through a fully mocked tracking
/// pipeline and prints each device's resulting pose.
#[derive(Parser)]
struct Args {
    /// Number of synthetic exposures to fire.
    #[clap(long, default_value_t = 10)]
    frames: u32,

    /// Number of LEDs in the mock device's constellation.
    #[clap(long, default_value_t = 16)]
    leds: usize,
}

fn main() -> Result<()> {
    logger::install()?;
    let args = Args::parse();

    let config = TrackerConfig::default();
    let tracker = Tracker::new(config.clone());

    let led_model: Arc<dyn LedModel> = Arc::new(MockLedModel::new(args.leds));
    let device = tracker.add_device(
        HMD_DEVICE_ID,
        led_model,
        Box::new(MockFusionFilter),
        Pose::identity(),
        Some(Box::new(MockDebugSinks)),
    );

    let intrinsics = Intrinsics::new(600.0, 600.0, 320.0, 240.0, [0.0; 5], DistortionModel::Fisheye);
    let transport = Arc::new(MockTransport::new(640, 480));
    let sensor = Sensor::new(
        0,
        intrinsics,
        640,
        480,
        Box::new(Arc::clone(&transport)),
        Box::new(MockBlobWatcher::default()),
        Box::new(MockCorrespondenceSearch),
        Box::new(MockPnp),
        None,
        Arc::downgrade(&tracker),
        config,
    );
    tracker.add_sensor(Arc::clone(&sensor));
    sensor.start()?;

    for i in 0..args.frames {
        device.imu_update(i * 1000, Vector3::zeros(), Vector3::new(0.0, 9.81, 0.0));
        tracker.update_exposure(u64::from(i) * 1_000_000, i * 1000, i as u16, 0);
        transport.fire_frame(u64::from(i) * 1_000_000);
        thread::sleep(Duration::from_millis(5));

        let pose = device.view_pose(tracker.config());
        tracing::info!(frame = i, position = ?pose.position, "device pose");
    }

    sensor.stop()?;
    Ok(())
}
