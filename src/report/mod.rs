//! Output modules.

pub mod generator;

pub use generator::*;
