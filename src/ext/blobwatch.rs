use super::BlobObservation;

/// The raw blob extractor (spec.md §6, "consumed"): turns one captured
/// image into a set of candidate LED blobs, and tracks each sensor's
/// persistent label memory across frames so accepted labels survive to the
/// next frame (spec.md §4.3, "transfer the per-device labels into the
/// sensor-wide `blobwatch` label memory").
pub trait BlobWatcher: Send {
    /// Extracts blobs from `image` (raw pixels, `width`x`height`), using
    /// `led_pattern_phase` to help disambiguate blink-coded LED identities
    /// against this watcher's persistent label memory.
    fn process(&mut self, image: &[u8], width: u32, height: u32, led_pattern_phase: u8) -> BlobObservation;

    /// Commits labels assigned during analysis of `device_id` back into the
    /// watcher's persistent memory, so the next call to `process` carries
    /// them forward.
    fn update_labels(&mut self, device_id: u8, observation: &BlobObservation);
}
