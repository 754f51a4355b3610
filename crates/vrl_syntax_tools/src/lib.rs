//! Developer utilities for vrl-syntax grammar artifacts and syntax trees.
//!
//! The `vrl-syntax` binary wraps these modules; they are exposed so the
//! renderers can be unit tested.

pub mod cli;
pub mod render;
