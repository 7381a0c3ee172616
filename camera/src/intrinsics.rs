/// Lens distortion model a [`Intrinsics`] block was decoded under.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistortionModel {
    /// Fisheye model (CV1): `k1..k4`.
    Fisheye,
    /// Rational-polynomial model (DK2): `k1, k2, p1, p2, k3`.
    RationalPolynomial,
}

/// Camera intrinsics: the 3x3 calibration matrix plus distortion
/// coefficients, decoded from a vendor calibration block.
///
/// ```text
///     ⎡ fx 0  cx ⎤
/// A = ⎢ 0  fy cy ⎥
///     ⎣ 0  0  1  ⎦
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Intrinsics {
    /// Row-major 3x3 calibration matrix `A` above.
    pub camera_matrix: [f64; 9],
    /// Up to 5 distortion coefficients; unused trailing entries are zero.
    pub dist_coeffs: [f64; 5],
    /// Which distortion model `dist_coeffs` should be interpreted under.
    pub dist_model: DistortionModel,
}

impl Intrinsics {
    pub(crate) fn new(
        fx: f64,
        fy: f64,
        cx: f64,
        cy: f64,
        dist_coeffs: [f64; 5],
        dist_model: DistortionModel,
    ) -> Self {
        #[rustfmt::skip]
        let camera_matrix = [
            fx,  0.0, cx,
            0.0, fy,  cy,
            0.0, 0.0, 1.0,
        ];
        Self { camera_matrix, dist_coeffs, dist_model }
    }

    /// `true` if this intrinsics block uses the fisheye distortion model.
    #[must_use]
    pub fn is_fisheye(&self) -> bool {
        matches!(self.dist_model, DistortionModel::Fisheye)
    }
}
