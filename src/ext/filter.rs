use crate::delay_slot::SlotId;
use crate::pose::Pose;
use nalgebra::Vector3;

/// A per-device fusion-filter snapshot queried at a point in time (spec.md
/// §4.8): pose plus the derivatives and error estimates the smoothing and
/// gravity-uncertainty logic need.
#[derive(Debug, Clone, Copy)]
pub struct FilterEstimate {
    /// Pose at the queried device-time.
    pub pose: Pose,
    /// Linear velocity, in the filter's reference frame.
    pub linear_velocity: Vector3<f64>,
    /// Linear acceleration, in the filter's reference frame.
    pub linear_acceleration: Vector3<f64>,
    /// Positional uncertainty (standard deviation per axis).
    pub pos_error: Vector3<f64>,
    /// Rotational uncertainty (standard deviation per axis, filter frame).
    pub rot_error: Vector3<f64>,
}

/// The Kalman/complementary fusion filter driving one tracked device
/// (spec.md §6, "consumed"; Non-goals, "does not implement the fusion
/// filter — it drives one"). One instance per [`crate::device::TrackedDevice`].
pub trait FusionFilter: Send {
    /// Integrates one IMU sample. `device_time_ns` must be monotonically
    /// non-decreasing across calls (spec.md §3 invariant).
    fn imu_update(
        &mut self,
        device_time_ns: u64,
        angular_velocity: Vector3<f64>,
        linear_acceleration: Vector3<f64>,
    );

    /// Fuses a full 6-DOF pose observation against the historical state
    /// held in `slot`.
    fn pose_update(&mut self, device_time_ns: u64, pose: &Pose, slot: SlotId);

    /// Fuses a position-only observation against `slot` — the
    /// `position_only` configuration path (`SPEC_FULL.md` §F.2).
    fn position_update(&mut self, device_time_ns: u64, position: &Vector3<f64>, slot: SlotId);

    /// Snapshots current filter state into `slot`, so a later delayed
    /// observation can be fused against the state as of `device_time_ns`.
    fn prepare_delay_slot(&mut self, device_time_ns: u64, slot: SlotId);

    /// Discards the snapshot held in `slot`. Called once `use_count`
    /// returns to zero (spec.md §4.7).
    fn release_delay_slot(&mut self, slot: SlotId);

    /// Queries filter state at `device_time_ns`, propagating from the
    /// latest internal state if necessary.
    fn get_pose_at(&self, device_time_ns: u64) -> FilterEstimate;
}
