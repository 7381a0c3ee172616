//! CV1/DK2 calibration-block decoding.
//!
//! The raw bytes come from a vendor-specific flash/EEPROM reader (out of
//! scope for this crate — see [`crate::Transport`]); this module only knows
//! the byte layout of the two known products.

use crate::intrinsics::{DistortionModel, Intrinsics};
use byteorder::{ByteOrder, LittleEndian};

/// Size in bytes of both the CV1 and DK2 calibration blocks.
pub const CALIBRATION_BLOCK_LEN: usize = 128;

/// Known sensor product identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Product {
    /// Rift CV1 sensor (fisheye lens).
    Cv1,
    /// Rift DK2 sensor (rational-polynomial lens).
    Dk2,
}

/// Errors decoding a calibration block.
#[derive(Debug, thiserror::Error)]
pub enum CalibrationError {
    /// The supplied buffer was shorter than [`CALIBRATION_BLOCK_LEN`].
    #[error("calibration block too short: got {got} bytes, need {CALIBRATION_BLOCK_LEN}")]
    ShortBuffer {
        /// Number of bytes actually supplied.
        got: usize,
    },
}

fn check_len(buf: &[u8]) -> Result<(), CalibrationError> {
    if buf.len() < CALIBRATION_BLOCK_LEN {
        return Err(CalibrationError::ShortBuffer { got: buf.len() });
    }
    Ok(())
}

/// Decodes a CV1 calibration block.
///
/// Layout (little-endian `f32`): `fx=fy` at `0x30`, `cx` at `0x34`, `cy` at
/// `0x38`, fisheye `k1..k4` at `0x48/0x4c/0x50/0x54`. Read from EEPROM/flash
/// offset `0x1d000`, 128 bytes.
pub fn decode_cv1(buf: &[u8]) -> Result<Intrinsics, CalibrationError> {
    check_len(buf)?;

    let fx = f64::from(LittleEndian::read_f32(&buf[0x30..]));
    let fy = fx;
    let cx = f64::from(LittleEndian::read_f32(&buf[0x34..]));
    let cy = f64::from(LittleEndian::read_f32(&buf[0x38..]));

    let k1 = f64::from(LittleEndian::read_f32(&buf[0x48..]));
    let k2 = f64::from(LittleEndian::read_f32(&buf[0x4c..]));
    let k3 = f64::from(LittleEndian::read_f32(&buf[0x50..]));
    let k4 = f64::from(LittleEndian::read_f32(&buf[0x54..]));

    Ok(Intrinsics::new(fx, fy, cx, cy, [k1, k2, k3, k4, 0.0], DistortionModel::Fisheye))
}

/// Decodes a DK2 calibration block.
///
/// Layout (little-endian `f64`): `fx@0x12, fy@0x1e, cx@0x2a, cy@0x36,
/// k1@0x42, k2@0x4e, p1@0x5a, p2@0x66, k3@0x72`. Read from EEPROM offset
/// `0x2000` as four 32-byte chunks.
///
/// The original OpenHMD DK2 driver writes `dist_coeffs[1]` twice — once with
/// `k2`, then again with `p1` — discarding `k2` entirely. That quirk is
/// preserved here (`[k1, p1, p2, k3]`, with `k2` decoded but dropped): the
/// downstream PnP solver expects the same four-coefficient layout the
/// original driver has always fed it, clobbered `k2` included.
pub fn decode_dk2(buf: &[u8]) -> Result<Intrinsics, CalibrationError> {
    check_len(buf)?;

    let fx = LittleEndian::read_f64(&buf[18..]);
    let fy = LittleEndian::read_f64(&buf[30..]);
    let cx = LittleEndian::read_f64(&buf[42..]);
    let cy = LittleEndian::read_f64(&buf[54..]);
    let k1 = LittleEndian::read_f64(&buf[66..]);
    let _k2 = LittleEndian::read_f64(&buf[78..]);
    let p1 = LittleEndian::read_f64(&buf[90..]);
    let p2 = LittleEndian::read_f64(&buf[102..]);
    let k3 = LittleEndian::read_f64(&buf[114..]);

    Ok(Intrinsics::new(
        fx,
        fy,
        cx,
        cy,
        [k1, p1, p2, k3, 0.0],
        DistortionModel::RationalPolynomial,
    ))
}

/// Decodes a calibration block for the given product.
pub fn decode(product: Product, buf: &[u8]) -> Result<Intrinsics, CalibrationError> {
    match product {
        Product::Cv1 => decode_cv1(buf),
        Product::Dk2 => decode_dk2(buf),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cv1_block(fx: f32, cx: f32, cy: f32, k: [f32; 4]) -> Vec<u8> {
        let mut buf = vec![0u8; CALIBRATION_BLOCK_LEN];
        LittleEndian::write_f32(&mut buf[0x30..], fx);
        LittleEndian::write_f32(&mut buf[0x34..], cx);
        LittleEndian::write_f32(&mut buf[0x38..], cy);
        LittleEndian::write_f32(&mut buf[0x48..], k[0]);
        LittleEndian::write_f32(&mut buf[0x4c..], k[1]);
        LittleEndian::write_f32(&mut buf[0x50..], k[2]);
        LittleEndian::write_f32(&mut buf[0x54..], k[3]);
        buf
    }

    #[test]
    fn cv1_decodes_fisheye_intrinsics() {
        let buf = cv1_block(600.0, 320.0, 240.0, [0.1, 0.2, 0.3, 0.4]);
        let intr = decode_cv1(&buf).unwrap();
        assert!(intr.is_fisheye());
        assert_eq!(intr.camera_matrix[0], 600.0);
        assert_eq!(intr.camera_matrix[4], 600.0);
        assert_eq!(intr.camera_matrix[2], 320.0);
        assert_eq!(intr.camera_matrix[5], 240.0);
        assert_eq!(intr.dist_coeffs, [0.1_f32 as f64, 0.2_f32 as f64, 0.3_f32 as f64, 0.4_f32 as f64, 0.0]);
    }

    #[test]
    fn cv1_rejects_short_buffer() {
        let err = decode_cv1(&[0u8; 16]).unwrap_err();
        assert!(matches!(err, CalibrationError::ShortBuffer { got: 16 }));
    }

    #[test]
    fn dk2_discards_k2_in_favor_of_p1() {
        let mut buf = vec![0u8; CALIBRATION_BLOCK_LEN];
        LittleEndian::write_f64(&mut buf[18..], 500.0);
        LittleEndian::write_f64(&mut buf[30..], 500.0);
        LittleEndian::write_f64(&mut buf[42..], 300.0);
        LittleEndian::write_f64(&mut buf[54..], 200.0);
        LittleEndian::write_f64(&mut buf[66..], 1.0); // k1
        LittleEndian::write_f64(&mut buf[78..], 999.0); // k2, discarded
        LittleEndian::write_f64(&mut buf[90..], 2.0); // p1
        LittleEndian::write_f64(&mut buf[102..], 3.0); // p2
        LittleEndian::write_f64(&mut buf[114..], 4.0); // k3

        let intr = decode_dk2(&buf).unwrap();
        assert!(!intr.is_fisheye());
        assert_eq!(intr.dist_coeffs, [1.0, 2.0, 3.0, 4.0, 0.0]);
    }
}
