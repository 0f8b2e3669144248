//! deltacal - dual-range voltage-delta calibration for AA/AAA detection
//!
//! - [`corpus`] turns monitor session logs into labeled delta samples
//! - [`calibrate`] derives per-class ranges and a one-sided threshold
//! - [`monitor`] polls a charger and flags detections that disagree with
//!   the declared test mode

pub mod calibrate;
pub mod cli;
pub mod config;
pub mod corpus;
pub mod models;
pub mod monitor;
pub mod reporters;
