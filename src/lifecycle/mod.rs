//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     Token cancelled → server stops accepting → drain in-flight requests
//!                     → in-flight storage calls observe cancellation
//!                     → storage shutdown → exit
//! ```
//!
//! # Design Decisions
//! - One root token per process; every request context is a child of it
//! - Draining has a deadline: the server gives up after the grace period

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::shutdown_signal;
