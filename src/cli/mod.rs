//! Command-line interface
//!
//! Argument definitions (clap derive) and report rendering.

pub mod args;
pub mod output;

pub use args::{Cli, Commands};
