//! Blueice math utilities.

pub mod math;

pub use math::grid::*;
pub use math::normal::*;
pub use math::stable::*;
