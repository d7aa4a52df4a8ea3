//! CLI command implementations.

pub mod calibrate;
mod common;
pub mod fir;
pub mod inspect;
pub mod station;
