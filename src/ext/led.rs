use nalgebra::Vector3;

/// A tracked device's rigid LED constellation geometry (spec.md §3, "LED
/// constellation geometry, a search index over that geometry"). Consumed by
/// [`super::CorrespondenceSearch`] and [`super::Pnp`] as the model to match
/// blobs against; this crate never interprets the geometry itself.
pub trait LedModel: Send + Sync {
    /// Positions of each LED in the device's model frame.
    fn led_positions(&self) -> &[Vector3<f64>];

    /// Unit outward normals of each LED, parallel to `led_positions`, used
    /// to decide visibility from a candidate viewing angle.
    fn led_normals(&self) -> &[Vector3<f64>];

    /// Number of LEDs in the constellation.
    fn len(&self) -> usize {
        self.led_positions().len()
    }

    /// Whether the constellation is empty.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
