//! Utility functions and helpers
//!
//! - [`util`] - Operation timing and timestamp tick conversion

pub mod util;
