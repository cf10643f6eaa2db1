//! Transport layer for CLI communication

pub mod cli;
