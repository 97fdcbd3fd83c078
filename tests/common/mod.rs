//! Common test infrastructure shared across integration tests.
//!
//! This module provides:
//! - `stubs`: scripted random sources and recording listeners
//! - `test_utils`: session constructors, reveal drivers and tracing setup
//!
//! # Usage
//!
//! ```ignore
//! #[path = "common/mod.rs"]
//! mod common;
//! use common::stubs::{RecordingListener, ScriptedRandom};
//! use common::{seeded_session, run_to_completion};
//! ```

pub mod stubs;
pub mod test_utils;

// Not every test binary uses every helper.
#[allow(unused_imports)]
pub use test_utils::{
    init_tracing, labels, run_to_completion, seeded_session, session_with, MAX_CALLBACKS,
};
