//! Sensor data acquisition module
//!
//! Turns line-delimited JSON from the sensor bridge into [`RawSample`]s.
//! Framing and transport live in [`crate::pipeline::source`].
//!
//! [`RawSample`]: crate::types::RawSample

pub mod decoder;

pub use decoder::{decode_line, encode_line, DecodeError};
