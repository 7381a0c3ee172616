use super::{Blob, LedModel, PoseMetrics};
use crate::pose::Pose;
use nalgebra::Vector3;
use rift_camera::Intrinsics;

/// The PnP solver and blob-scoring helpers (spec.md §6, §4.4): fits a
/// camera-relative pose to a set of labeled blobs and scores how well a
/// candidate pose explains them.
pub trait Pnp: Send + Sync {
    /// Estimates an initial camera-relative pose from scratch, from
    /// whichever blobs in `blobs` are labeled for `device_id`.
    /// `refine_extrinsic` requests an extra nonlinear refinement pass
    /// (spec.md §4.2 step 4 vs. §4.4 step 3).
    fn estimate_initial_pose(
        &self,
        blobs: &[Blob],
        device_id: u8,
        model: &dyn LedModel,
        intrinsics: &Intrinsics,
        refine_extrinsic: bool,
    ) -> Option<Pose>;

    /// Projects `pose` onto the image plane and (re)labels blobs in
    /// `blobs` whose viewing angle to the camera is within the visibility
    /// threshold, for LEDs belonging to `device_id` (spec.md §4.4 step 2).
    fn mark_matching_blobs(
        &self,
        pose: &Pose,
        blobs: &mut [Blob],
        device_id: u8,
        model: &dyn LedModel,
        intrinsics: &Intrinsics,
    );

    /// Scores how well `pose` explains the blobs currently labeled for
    /// `device_id`.
    fn evaluate_pose(
        &self,
        pose: &Pose,
        blobs: &[Blob],
        device_id: u8,
        model: &dyn LedModel,
        intrinsics: &Intrinsics,
    ) -> PoseMetrics;

    /// As [`Self::evaluate_pose`], but weights the score by how far `pose`
    /// has drifted from a `prior` pose with known positional/rotational
    /// uncertainty, used by the fast-reacquire path (spec.md §4.2 step 2).
    fn evaluate_pose_with_prior(
        &self,
        pose: &Pose,
        prior: &Pose,
        pos_error: &Vector3<f64>,
        rot_error: &Vector3<f64>,
        blobs: &[Blob],
        device_id: u8,
        model: &dyn LedModel,
        intrinsics: &Intrinsics,
    ) -> PoseMetrics;
}
