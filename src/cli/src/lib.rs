//! A3S Ferry CLI - offline container image export and import.

pub mod commands;
pub mod output;
