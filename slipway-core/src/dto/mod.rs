//! Wire payload shapes
//!
//! This module contains the declared shapes of payloads accepted from
//! webhook callers. They are intentionally loose: callers send whatever
//! their forge produces, and extraction only cares about a couple of
//! fields.

pub mod webhook;
