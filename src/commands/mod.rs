//! CLI command handlers.
//!
//! Each submodule handles a specific CLI command:
//! - `build` - Compile the project into a phar
//! - `preflight` - Check inputs before building
//! - `strip` - Print a stripped PHP file
//! - `inspect` - List and verify existing archives
//! - `show` - Display information

mod build;
mod inspect;
mod preflight;
pub mod show;
mod strip;

pub use build::cmd_build;
pub use inspect::{cmd_list, cmd_verify};
pub use preflight::cmd_preflight;
pub use show::cmd_show;
pub use strip::cmd_strip;
