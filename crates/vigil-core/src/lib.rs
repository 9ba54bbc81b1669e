//! Surveillance and command-authorization core
//!
//! This crate holds the components with real state and policy:
//! - The authorization gate checked by every privileged entry point
//! - The best-effort audit sink backing the security event trail
//! - The whitelisted command execution gateway
//! - The motion detection engine and its cooldown
//! - The alert dispatcher and the transport seam it fans out through
//! - The voice command pipeline
//! - The scheduled task service and the driver that fires tasks
//! - The `Monitor` operations facade tying them together

mod alert;
mod audit;
mod auth;
mod detect;
mod engine;
mod frame;
mod gateway;
mod ops;
mod scheduler;
mod tasks;
mod voice;

pub use alert::*;
pub use audit::*;
pub use auth::*;
pub use detect::*;
pub use engine::*;
pub use frame::*;
pub use gateway::*;
pub use ops::*;
pub use scheduler::*;
pub use tasks::*;
pub use voice::*;
