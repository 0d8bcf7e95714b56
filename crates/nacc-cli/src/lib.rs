//! Library side of the `nacc` command line runner.

pub mod config;
pub mod logging;
pub mod runner;
