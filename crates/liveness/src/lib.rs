//! # Liveness
//!
//! Per-device connectivity state machine: `unknown -> online <-> offline`.
//!
//! Connectivity is written here and nowhere else. Accepted status reports
//! flip a device online; the periodic sweep flips it offline once no report
//! has been accepted within the timeout window. Dispatch failures never touch
//! connectivity; the dispatcher may only nudge the sweep to run early.

mod tracker;

pub use tracker::LivenessTracker;
