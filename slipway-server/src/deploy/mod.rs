//! Deployment layer
//!
//! Owns the per-job container lifecycle from accepted webhook to terminal
//! state: build the image, stop and wait out whatever was running, prune,
//! launch the new container, and watch it until it exits.

pub mod orchestrator;

pub use orchestrator::Orchestrator;
