//! External trait seams (spec.md §6): the black boxes this crate drives but
//! does not implement — blob detection, LED-constellation correspondence
//! search, PnP, the fusion filter, and debug sinks. Also the small
//! vocabulary of data types ([`Blob`], [`PoseMetrics`], [`SearchFlags`])
//! those interfaces pass back and forth.
//!
//! Camera calibration decoding and the raw capture stream live in the
//! `rift-camera` crate instead ([`rift_camera::Transport`]); everything here
//! is consumed only after a frame has been captured.

mod blobwatch;
mod debug_sinks;
mod filter;
mod led;
pub mod mock;
mod pnp;
mod search;

pub use self::{
    blobwatch::BlobWatcher,
    debug_sinks::DebugSinks,
    filter::{FilterEstimate, FusionFilter},
    led::LedModel,
    pnp::Pnp,
    search::CorrespondenceSearch,
};

use nalgebra::Vector3;
use serde::{Deserialize, Serialize};

/// One detected bright region in an IR image, with the device/LED label the
/// extractor or correspondence search has (tentatively) assigned it.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Blob {
    /// Horizontal center, in pixels.
    pub x: f32,
    /// Vertical center, in pixels.
    pub y: f32,
    /// Bounding-box width, in pixels.
    pub width: f32,
    /// Bounding-box height, in pixels.
    pub height: f32,
    /// `(device_id, led_id)` this blob is currently believed to be, if any.
    pub label: Option<(u8, u8)>,
    /// The label this blob carried going into the current analysis pass,
    /// kept so a rejected relabel can be rolled back (spec.md §4.4 step 1).
    pub previous_label: Option<(u8, u8)>,
}

/// A time-stamped set of [`Blob`]s produced by the blob extractor from one
/// image (spec.md GLOSSARY, "Blob observation").
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct BlobObservation {
    /// The blobs found in this frame.
    pub blobs: Vec<Blob>,
}

impl BlobObservation {
    /// Blobs currently labeled as belonging to `device_id`.
    pub fn labeled_for(&self, device_id: u8) -> impl Iterator<Item = &Blob> {
        self.blobs.iter().filter(move |b| b.label.is_some_and(|(d, _)| d == device_id))
    }
}

/// Flags threaded through [`CorrespondenceSearch`] calls, controlling how
/// hard a single search attempt looks before giving up (spec.md §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchFlags(u32);

impl SearchFlags {
    /// Stop as soon as a strong match is found rather than continuing to
    /// look for a better one.
    pub const STOP_FOR_STRONG_MATCH: SearchFlags = SearchFlags(1 << 0);
    /// Require every blob believed to belong to the device to be matched,
    /// not just enough to exceed the good-match threshold.
    pub const MATCH_ALL_BLOBS: SearchFlags = SearchFlags(1 << 1);
    /// Pass-0 shallow search: cheaper, only strong matches commit.
    pub const SHALLOW: SearchFlags = SearchFlags(1 << 2);
    /// Pass-1 deep search: more exhaustive, good matches commit.
    pub const DEEP: SearchFlags = SearchFlags(1 << 3);
    /// No flags set.
    pub const NONE: SearchFlags = SearchFlags(0);

    /// Whether `self` includes every bit set in `other`.
    #[must_use]
    pub fn contains(self, other: SearchFlags) -> bool {
        self.0 & other.0 == other.0
    }
}

impl std::ops::BitOr for SearchFlags {
    type Output = SearchFlags;

    fn bitor(self, rhs: SearchFlags) -> SearchFlags {
        SearchFlags(self.0 | rhs.0)
    }
}

/// A structured assessment of a candidate pose (spec.md GLOSSARY, "Pose
/// score"): how many of the device's LEDs are visible versus matched, and
/// the two quality thresholds the pipeline branches on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseMetrics {
    /// Number of LEDs on the device predicted to be visible from this pose.
    pub visible_leds: u32,
    /// Number of blobs matched to those visible LEDs.
    pub matched_blobs: u32,
    /// The match count and geometric residuals both exceed the looser
    /// threshold.
    pub good_match: bool,
    /// The match count and geometric residuals both exceed the tighter
    /// threshold; only strong matches commit in search pass 0.
    pub strong_match: bool,
}

/// The gravity direction in a device's fusion-filter frame, used to
/// constrain an aligned search (spec.md §4.3).
pub type Gravity = Vector3<f64>;
