//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → server stops accepting → in-flight responses finish → exit
//! ```
//!
//! # Design Decisions
//! - Detached prefetch jobs are not awaited; exiting abandons them

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
