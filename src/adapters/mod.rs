//! Adapters connecting the advisor to a user-facing surface.

pub mod cli;
