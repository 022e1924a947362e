//! Core math modules.

pub mod grid;
pub mod normal;
pub mod stable;
