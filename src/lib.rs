//! Mudra – geometric hand gesture recognition.
//!
//! This crate turns the 21 hand landmarks predicted by a neural network into a named gesture with
//! a confidence score, and drives the recognition loop that feeds camera frames through such a
//! network without ever having more than one inference in flight.
//!
//! The crate does not capture camera frames, run neural networks, or draw anything. Those live
//! behind the [`FrameSource`], [`LandmarkProvider`] and [`RecognitionSink`] traits in [`tracker`]
//! and are supplied by the host application.
//!
//! # Coordinates
//!
//! Landmark positions use image/tensor coordinates: X points to the right, Y points *down*, Z
//! points away from the camera. Finger directions like [`FingerDirection::Up`] are therefore
//! directions of *decreasing* Y. Only relative angles and normalized directions are ever
//! inspected, so the absolute scale of the coordinates does not matter.
//!
//! [`FrameSource`]: tracker::FrameSource
//! [`LandmarkProvider`]: tracker::LandmarkProvider
//! [`RecognitionSink`]: tracker::RecognitionSink
//! [`FingerDirection::Up`]: finger::FingerDirection::Up

use log::LevelFilter;

pub mod finger;
pub mod gesture;
pub mod landmark;
pub mod num;
pub mod tracker;

/// macro-use only, not part of public API.
#[doc(hidden)]
pub fn init_logger(calling_crate: &'static str) {
    let log_level = LevelFilter::Debug;
    env_logger::Builder::new()
        .filter(Some(calling_crate), log_level)
        .filter(Some(env!("CARGO_PKG_NAME")), log_level)
        .parse_default_env()
        .try_init()
        .ok();
}

/// Initializes logging to *stderr*.
///
/// The calling crate and mudra will log at *debug* level; `RUST_LOG` can override this.
///
/// If a global logger is already registered, this macro will do nothing.
#[macro_export]
macro_rules! init_logger {
    () => {
        $crate::init_logger(env!("CARGO_CRATE_NAME"))
    };
}
