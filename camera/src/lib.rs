//! Narrow hardware-facing interfaces for the tracking core: camera
//! intrinsics/distortion models, the CV1/DK2 EEPROM calibration-block
//! decoders, and the [`Transport`] trait a capture backend implements
//! against.
//!
//! This crate intentionally contains no USB/UVC code. Streaming and device
//! control are external collaborators; this crate only knows how to turn
//! the raw calibration bytes a vendor flash/EEPROM reader returns into an
//! [`Intrinsics`], and how the core expects to be called back by whatever
//! owns the capture stream.

#![warn(missing_docs)]
#![allow(clippy::missing_errors_doc)]

mod calibration;
mod intrinsics;
mod transport;

pub use self::{
    calibration::{decode_cv1, decode_dk2, CalibrationError, Product},
    intrinsics::{DistortionModel, Intrinsics},
    transport::{FrameId, Transport, TransportSink},
};
