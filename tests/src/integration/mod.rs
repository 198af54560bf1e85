//! Cross-subsystem integration scenarios.

pub mod detection_flows;
pub mod end_to_end;
pub mod temporal_flows;

pub mod fixtures;
