//! Adapter implementations of the port traits.
//!
//! `live` talks to the real world; `scripted` is deterministic and in-memory.

pub mod live;
pub mod scripted;
