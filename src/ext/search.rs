use super::{Blob, Gravity, LedModel, PoseMetrics, SearchFlags};
use crate::pose::Pose;
use nalgebra::UnitQuaternion;
use std::sync::Arc;

/// The combinatorial LED-constellation correspondence search (spec.md §6,
/// §4.3): given a set of blobs and a device's LED geometry, finds a camera-
/// relative pose that explains as many of them as possible.
pub trait CorrespondenceSearch: Send {
    /// Registers (or replaces) the LED geometry searched against for
    /// `device_id`.
    fn set_model(&mut self, device_id: u8, model: Arc<dyn LedModel>);

    /// Replaces the blob set searches are run against until the next call.
    fn set_blobs(&mut self, blobs: &[Blob]);

    /// Searches for a single best pose for `device_id`, starting from
    /// `pose` as an initial guess (also used as the output parameter).
    /// Returns the resulting [`PoseMetrics`].
    fn find_one_pose(&mut self, device_id: u8, flags: SearchFlags, pose: &mut Pose) -> PoseMetrics;

    /// As [`Self::find_one_pose`], but constrains the search to
    /// orientations whose swing about `gravity` is within `tolerance_rad`
    /// of `prior_swing` (spec.md §4.3, aligned search).
    fn find_one_pose_aligned(
        &mut self,
        device_id: u8,
        flags: SearchFlags,
        pose: &mut Pose,
        gravity: &Gravity,
        prior_swing: &UnitQuaternion<f64>,
        tolerance_rad: f64,
    ) -> PoseMetrics;
}
