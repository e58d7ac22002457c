//! Upsetter command line.

pub mod cli;
