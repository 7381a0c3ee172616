//! Per-camera sensor pipeline (spec.md §2, §4.2, §5): capture-buffer
//! rotation, the fast- and long-analysis worker threads, and the condition
//! variable coordinating them with the capture transport's callbacks.
//!
//! Submodules hold the analysis logic proper: [`fast`] (reacquire), [`long`]
//! (deep correspondence search), [`refine`] (shared refine-and-submit path),
//! and [`bootstrap`] (camera-pose bootstrap).

mod bootstrap;
mod fast;
mod long;
mod refine;

use crate::config::TrackerConfig;
use crate::device::TrackedDevice;
use crate::ext::{BlobWatcher, CorrespondenceSearch, DebugSinks, Pnp};
use crate::frame::{CaptureFrame, FrameTimeline};
use crate::queue::BoundedQueue;
use crate::tracker::Tracker;
use rift_camera::{FrameId, Intrinsics, Transport, TransportSink};
use std::sync::{Arc, Condvar, Mutex, Weak};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

struct SensorState {
    capture_q: BoundedQueue<Box<CaptureFrame>>,
    fast_q: BoundedQueue<Box<CaptureFrame>>,
    long_q: BoundedQueue<Box<CaptureFrame>>,
    cur_capture: Option<Box<CaptureFrame>>,
    dropped_frames: u32,
    long_analysis_busy: bool,
    shutdown: bool,
    camera_pose: Option<crate::pose::Pose>,
}

/// One camera's capture pipeline (spec.md §3, "Sensor Context").
pub struct Sensor {
    /// Small integer id, unique among sensors in a session.
    pub id: u32,
    intrinsics: Intrinsics,
    image_width: u32,
    image_height: u32,
    tracker: Weak<Tracker>,
    devices: Mutex<Vec<Arc<TrackedDevice>>>,
    blobwatch: Mutex<Box<dyn BlobWatcher>>,
    correspondence: Mutex<Box<dyn CorrespondenceSearch>>,
    pnp: Box<dyn Pnp>,
    debug_sinks: Option<Box<dyn DebugSinks>>,
    transport: Mutex<Box<dyn Transport>>,
    config: TrackerConfig,
    state: Mutex<SensorState>,
    cond: Condvar,
    workers: Mutex<Vec<JoinHandle<()>>>,
}

fn now_ns() -> u64 {
    SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos() as u64).unwrap_or(0)
}

impl Sensor {
    /// Builds a sensor with a freshly allocated pool of
    /// `config.num_capture_buffers` frame buffers, all starting in the
    /// `capture` queue, and registers itself as the transport's callback
    /// sink. Does not yet spawn the analysis threads or start the
    /// transport — call [`Self::start`] once the `Arc` exists.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: u32,
        intrinsics: Intrinsics,
        image_width: u32,
        image_height: u32,
        mut transport: Box<dyn Transport>,
        blobwatch: Box<dyn BlobWatcher>,
        correspondence: Box<dyn CorrespondenceSearch>,
        pnp: Box<dyn Pnp>,
        debug_sinks: Option<Box<dyn DebugSinks>>,
        tracker: Weak<Tracker>,
        config: TrackerConfig,
    ) -> Arc<Self> {
        let mut capture_q = BoundedQueue::new(config.num_capture_buffers);
        for frame_id in 0..config.num_capture_buffers {
            capture_q.push(Box::new(CaptureFrame::new(frame_id as FrameId)));
        }

        let sensor = Arc::new(Sensor {
            id,
            intrinsics,
            image_width,
            image_height,
            tracker,
            devices: Mutex::new(Vec::new()),
            blobwatch: Mutex::new(blobwatch),
            correspondence: Mutex::new(correspondence),
            pnp,
            debug_sinks,
            transport: Mutex::new(Box::new(NullTransportPlaceholder) as Box<dyn Transport>),
            config,
            state: Mutex::new(SensorState {
                capture_q,
                fast_q: BoundedQueue::new(4),
                long_q: BoundedQueue::new(4),
                cur_capture: None,
                dropped_frames: 0,
                long_analysis_busy: false,
                shutdown: false,
                camera_pose: None,
            }),
            workers: Mutex::new(Vec::new()),
        });

        transport.set_sink(Arc::clone(&sensor) as Arc<dyn TransportSink>);
        *sensor.transport.lock().unwrap() = transport;
        sensor
    }

    /// Starts the capture transport and spawns the fast- and
    /// long-analysis worker threads.
    pub fn start(self: &Arc<Self>) -> eyre::Result<()> {
        self.transport.lock().unwrap().start()?;

        let mut workers = self.workers.lock().unwrap();
        let fast_sensor = Arc::clone(self);
        workers.push(thread::spawn(move || fast_sensor.fast_analysis_loop()));
        let long_sensor = Arc::clone(self);
        workers.push(thread::spawn(move || long_sensor.long_analysis_loop()));
        Ok(())
    }

    /// Signals shutdown and joins the analysis threads. Safe to call once;
    /// further calls are no-ops.
    pub fn stop(self: &Arc<Self>) -> eyre::Result<()> {
        {
            let mut state = self.state.lock().unwrap();
            state.shutdown = true;
            self.cond.notify_all();
        }
        for handle in self.workers.lock().unwrap().drain(..) {
            let _ = handle.join();
        }
        let mut transport = self.transport.lock().unwrap();
        transport.stop()?;
        transport.clear();
        Ok(())
    }

    /// Adds a device to this sensor's correspondence-search model set
    /// (spec.md §4.6, broadcast on registration).
    pub fn add_device(&self, device: Arc<TrackedDevice>) {
        self.correspondence.lock().unwrap().set_model(device.id, Arc::clone(device.led_model()));
        self.devices.lock().unwrap().push(device);
    }

    /// Called by the tracker after `update_exposure` installs a fresh
    /// exposure record, so a sensor blocked waiting for capture work can
    /// re-check whatever it was waiting on. The pipeline itself reads
    /// exposure info lazily (on SOF), so this is advisory only.
    pub fn notify_new_exposure(&self) {
        self.cond.notify_all();
    }

    /// Whether a camera→world pose has been bootstrapped yet (spec.md
    /// §4.5).
    #[must_use]
    pub fn has_camera_pose(&self) -> bool {
        self.state.lock().unwrap().camera_pose.is_some()
    }

    /// The bootstrapped camera→world pose, if any.
    #[must_use]
    pub fn camera_pose(&self) -> Option<crate::pose::Pose> {
        self.state.lock().unwrap().camera_pose
    }

    /// Returns a frame's buffer to the `capture` queue, releasing whatever
    /// exposure it carried. Runs entirely under the sensor lock; the
    /// caller is responsible for calling `Tracker::frame_release` with the
    /// returned exposure *after* dropping the lock (spec.md §5, "sensor
    /// code explicitly drops its lock before invoking tracker hooks").
    fn release_capture_frame(
        &self,
        state: &mut SensorState,
        mut frame: Box<CaptureFrame>,
    ) -> Option<crate::exposure::ExposureInfo> {
        self.log_frame_timing(&frame);
        let exposure = frame.exposure.take();
        frame.reset();
        state.capture_q.push(frame);
        exposure
    }

    /// Per-frame timing breadcrumb (`SPEC_FULL.md` §F.3): capture→release
    /// latency broken down by pipeline stage.
    fn log_frame_timing(&self, frame: &CaptureFrame) {
        let t = &frame.timeline;
        let Some(delivered) = t.delivered_ns else { return };
        tracing::debug!(
            sensor = self.id,
            frame_id = frame.id,
            blob_ms = t.blob_done_ns.map(|b| (b.saturating_sub(delivered)) as f64 / 1e6),
            fast_ms = t.fast_done_ns.map(|f| (f.saturating_sub(delivered)) as f64 / 1e6),
            long_queued_ms = t
                .long_start_ns
                .and_then(|s| t.fast_done_ns.map(|f| (s.saturating_sub(f)) as f64 / 1e6)),
            long_ms = t
                .long_done_ns
                .and_then(|d| t.long_start_ns.map(|s| (d.saturating_sub(s)) as f64 / 1e6)),
            "frame released"
        );
    }

    fn tracker(&self) -> Option<Arc<Tracker>> {
        self.tracker.upgrade()
    }

    fn handle_start_of_frame(&self, start_time_ns: u64) {
        tracing::trace!(sensor = self.id, start_time_ns, "start of frame");
        let Some(tracker) = self.tracker() else { return };
        let exposure_info = tracker.current_exposure_info();

        let (frame_id, displaced_exposure) = {
            let mut state = self.state.lock().unwrap();

            let (mut frame, displaced) = if let Some(mut cur) = state.cur_capture.take() {
                let displaced = cur.exposure.take();
                cur.reset();
                (cur, displaced)
            } else if let Some(frame) = state.capture_q.pop() {
                (frame, None)
            } else {
                let reclaimed = state.fast_q.rewind().or_else(|| state.long_q.rewind());
                let mut frame = reclaimed
                    .expect("capture, fast, and long queues all empty: invariant violated");
                let displaced = frame.exposure.take();
                frame.reset();
                state.dropped_frames += 1;
                tracing::warn!(
                    sensor = self.id,
                    dropped_frames = state.dropped_frames,
                    "no free capture buffer; reclaimed a pending frame"
                );
                (frame, displaced)
            };

            frame.exposure = exposure_info.clone();
            frame.timeline = FrameTimeline::default();
            let frame_id = frame.id;
            state.cur_capture = Some(frame);
            (frame_id, displaced)
        };

        self.transport.lock().unwrap().set_frame(frame_id);

        match displaced_exposure {
            Some(old) => tracker.exposure_patch(exposure_info.as_ref(), &old),
            None => tracker.frame_start(exposure_info.as_ref()),
        }
    }

    fn handle_frame_complete(&self, frame_id: FrameId) {
        let Some(tracker) = self.tracker() else { return };
        let delivered_ns = now_ns();

        let mut state = self.state.lock().unwrap();
        let Some(mut frame) = state.cur_capture.take() else { return };
        assert_eq!(frame.id, frame_id, "frame-complete for a buffer that wasn't given out");

        let Some(exposure) = frame.exposure.clone() else {
            frame.reset();
            state.capture_q.push(frame);
            return;
        };

        frame.device_states = exposure
            .devices
            .iter()
            .map(|record| crate::frame::PerDeviceFrameState {
                capture_world_pose: record.predicted_pose,
                gravity_error_rad: record.gravity_error_rad(),
                orientation_error_rad: record.rot_error.norm(),
                ..crate::frame::PerDeviceFrameState::default()
            })
            .collect();
        frame.timeline.delivered_ns = Some(delivered_ns);

        state.fast_q.push(frame);
        self.cond.notify_all();
        drop(state);
        tracker.frame_captured(self.id, frame_id);
    }
}

impl TransportSink for Sensor {
    fn on_start_of_frame(&self, start_time_ns: u64) {
        self.handle_start_of_frame(start_time_ns);
    }

    fn on_frame_complete(&self, frame_id: FrameId) {
        self.handle_frame_complete(frame_id);
    }
}

/// Placeholder transport swapped in during construction, replaced with the
/// caller-supplied one immediately after the sink is registered (avoids a
/// chicken-and-egg `Arc::new_cyclic` dance for a one-field swap).
struct NullTransportPlaceholder;

impl Transport for NullTransportPlaceholder {
    fn set_sink(&mut self, _sink: Arc<dyn TransportSink>) {}
    fn start(&mut self) -> eyre::Result<()> {
        Ok(())
    }
    fn stop(&mut self) -> eyre::Result<()> {
        Ok(())
    }
    fn clear(&mut self) {}
    fn set_frame(&mut self, _frame_id: FrameId) {}
    fn buffer(&self, _frame_id: FrameId) -> &[u8] {
        &[]
    }
}
