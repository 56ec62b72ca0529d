//! Slipway Core
//!
//! Core types for the Slipway deployment service.
//!
//! This crate contains:
//! - Domain types: the build request, job state machine, and log records
//! - DTOs: wire payload shapes accepted from webhook callers
//!
//! # Example
//!
//! ```
//! use slipway_core::domain::job::BuildRequest;
//!
//! let request = BuildRequest {
//!     repo: "bot".to_string(),
//!     tag: "demo".to_string(),
//!     git_url: "git@github.com:acme/bot.git".to_string(),
//!     branch: "main".to_string(),
//!     folder: None,
//! };
//!
//! assert_eq!(request.image_ref(), "bot:demo");
//! assert_eq!(request.build_context(), "git@github.com:acme/bot.git#main");
//! ```

pub mod domain;
pub mod dto;
