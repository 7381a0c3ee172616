/// Optional debug outputs (spec.md §6): a raw-video sink, an annotated-video
/// sink (double-width RGB: source frame beside an overlay), and a
/// JSON-metadata sink. All three are connectivity-checked before use and
/// must never block the pipeline — an implementation should drop frames
/// rather than apply backpressure.
pub trait DebugSinks: Send + Sync {
    /// Whether anything is listening for raw video.
    fn raw_video_connected(&self) -> bool {
        false
    }

    /// Publishes one raw frame. Only called when
    /// [`Self::raw_video_connected`] returned `true`.
    fn push_raw_video(&self, _timestamp_ns: u64, _image: &[u8], _width: u32, _height: u32) {}

    /// Whether anything is listening for annotated video.
    fn annotated_video_connected(&self) -> bool {
        false
    }

    /// Publishes one annotated frame (double-width RGB: source beside
    /// overlay). Only called when [`Self::annotated_video_connected`]
    /// returned `true`.
    fn push_annotated_video(&self, _timestamp_ns: u64, _rgb: &[u8], _width: u32, _height: u32) {}

    /// Whether anything is listening for metadata.
    fn metadata_connected(&self) -> bool {
        false
    }

    /// Publishes one JSON metadata record. Only called when
    /// [`Self::metadata_connected`] returned `true`.
    fn push_metadata_json(&self, _timestamp_ns: u64, _json: &str) {}
}
