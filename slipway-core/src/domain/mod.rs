//! Core domain types
//!
//! This module contains the domain structures shared across the Slipway
//! server. These types represent the fundamental entities of a deployment:
//! the extracted build request, the per-job lifecycle state, and the
//! records written to the event log.

pub mod job;
pub mod log;
