//! # Quantum-Sentinel Test Suite
//!
//! Unified test crate containing cross-subsystem scenarios.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── detection_flows.rs   # Canary token lifecycle and classifier bank
//!     ├── temporal_flows.rs    # Aggregation, commitments, consensus, detector
//!     └── end_to_end.rs        # Detection running on the hardened clock
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p qs-tests
//!
//! # By category
//! cargo test -p qs-tests integration::detection_flows
//! cargo test -p qs-tests integration::temporal_flows
//! cargo test -p qs-tests integration::end_to_end
//! ```

#![allow(unused_imports)]
#![allow(dead_code)]

pub mod integration;
