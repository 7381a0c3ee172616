//! A multi-sensor optical tracking core for a Rift-style positional
//! tracking subsystem.
//!
//! # Architecture
//!
//! See the [`tracker`] module documentation for the synchronization and
//! ownership model ([`Tracker`] owns devices and sensors; [`sensor::Sensor`]
//! runs each camera's capture pipeline on its own pair of worker threads).
//! [`device::TrackedDevice`] holds one device's fusion filter and delay-slot
//! ring; the [`ext`] module defines the trait seams external collaborators
//! (capture transport, blob detector, correspondence search, PnP solver,
//! fusion filter) plug into.
//!
//! # Guidelines
//!
//! The code should be formatted with Rustfmt using the project-level
//! `rustfmt.toml`. E.g. run from the command line: `cargo fmt`.
//!
//! The code should pass clippy lints in pedantic mode. E.g. run from the
//! command line: `cargo clippy`. It's fine to suppress some lint locally with
//! `#[allow(clippy:<lint>)]` attribute.
//!
//! The code should be properly documented and should pass the
//! `#[warn(missing_docs)]` lint.
//!
//! The code should pass the official [Rust API
//! Guidelines](https://rust-lang.github.io/api-guidelines/checklist.html)

#![warn(missing_docs, unsafe_op_in_unsafe_fn)]
#![warn(clippy::pedantic)]
#![allow(clippy::doc_markdown, clippy::missing_errors_doc, clippy::missing_panics_doc)]

pub mod config;
pub mod delay_slot;
pub mod device;
pub mod error;
pub mod exposure;
pub mod ext;
pub mod frame;
pub mod logger;
pub mod pose;
pub mod queue;
pub mod sensor;
pub mod tracker;

pub use config::TrackerConfig;
pub use device::TrackedDevice;
pub use pose::Pose;
pub use tracker::Tracker;
