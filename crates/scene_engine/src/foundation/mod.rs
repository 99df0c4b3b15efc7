//! Foundation layer: math types and logging
//!
//! Shared primitives with no dependency on the object model or the scene
//! modules above them.

pub mod logging;
pub mod math;
