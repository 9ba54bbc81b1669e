//! Shared utilities for vigild
//!
//! This crate provides:
//! - ID types (OperatorId, TaskId, EventId, ClientId)
//! - Time utilities (strict HH:MM time-of-day, monotonic instants)
//! - The error taxonomy shared by every component

mod error;
mod ids;
mod time;

pub use error::*;
pub use ids::*;
pub use time::*;
