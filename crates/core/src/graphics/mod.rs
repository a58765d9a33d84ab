//! Reusable graphics utilities for emulator systems

pub mod color;
pub mod scale;

pub use color::ColorOps;
pub use scale::scale_nearest;
