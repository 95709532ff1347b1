//! Background scheduling of update checks.
//!
//! Runs the scheduled update check once at startup and then on a fixed
//! interval (6 hours by default).

pub mod runner;

pub use runner::Scheduler;
