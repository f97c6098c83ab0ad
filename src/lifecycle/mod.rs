//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Shutdown (shutdown.rs):
//!     Ctrl+C in main → Shutdown::trigger
//!     → monitor loop and evaluation loop stop selecting new ticks
//!     → admin server stops accepting
//! ```
//!
//! # Design Decisions
//! - Work already started (probes, a cutover) finishes or times out
//! - Loops started after the trigger exit immediately

pub mod shutdown;

pub use shutdown::Shutdown;
