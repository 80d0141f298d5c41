//! pharc library exports.
//!
//! The binary in `main.rs` is a thin CLI over these modules; integration
//! tests drive them directly.

pub mod archive;
pub mod compiler;
pub mod config;
pub mod layout;
pub mod logging;
pub mod preflight;
pub mod select;
pub mod strip;
pub mod stub;
pub mod timing;

pub use compiler::{BuildPlan, CompileReport, Compiler};
