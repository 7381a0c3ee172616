//! The capture-stream seam (spec.md §6 "Transport (consumed)").
//!
//! USB/UVC streaming and device control are external collaborators. The
//! tracking core only needs two things from whatever owns the stream:
//! somewhere to publish the next capture target ([`Transport`]), and a way
//! to be told when a new exposure starts and when a frame finishes
//! ([`TransportSink`], implemented by the sensor pipeline).

/// Index of one of the capture backend's frame buffers.
pub type FrameId = usize;

/// Callback target for a capture stream: implemented by the sensor
/// pipeline, invoked by whatever drives the transport.
pub trait TransportSink: Send + Sync {
    /// A new exposure has begun. `start_time_ns` is a monotonic local
    /// timestamp in nanoseconds.
    fn on_start_of_frame(&self, start_time_ns: u64);

    /// The frame previously set with [`Transport::set_frame`] has been
    /// fully delivered.
    fn on_frame_complete(&self, frame_id: FrameId);
}

/// An opaque capture stream. Lifecycle operations plus the single
/// `set_frame` hand-off the core uses to publish its next capture target.
pub trait Transport: Send {
    /// Registers the callback target invoked for SOF/EOF events. Must be
    /// called before [`Self::start`].
    fn set_sink(&mut self, sink: std::sync::Arc<dyn TransportSink>);

    /// Begins streaming, invoking the sink's callbacks as frames arrive.
    fn start(&mut self) -> eyre::Result<()>;

    /// Stops streaming. Safe to call multiple times.
    fn stop(&mut self) -> eyre::Result<()>;

    /// Releases any stream resources. Called once during teardown, after
    /// `stop`.
    fn clear(&mut self);

    /// Publishes the buffer the transport should capture the next frame
    /// into.
    fn set_frame(&mut self, frame_id: FrameId);

    /// Borrows the raw pixel data most recently captured into `frame_id`.
    fn buffer(&self, frame_id: FrameId) -> &[u8];
}
