//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Init observability → Start sinks → Serve
//!
//! Shutdown:
//!     Signal received → Stop accepting → Finish in-flight requests
//!     → Stop log sink consumers → Exit
//! ```

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
pub use signals::watch_signals;
