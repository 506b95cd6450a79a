//! Asynchronous request/response logging pipeline.
//!
//! # Data Flow
//! ```text
//! Dispatch loop / pipeline stages
//!     → registry.rs (named LogEvents, group tags, debug/undebug)
//!     → event.rs (active-target set, non-blocking emission)
//!     → sink.rs (one unbounded channel + consumer task per
//!                (sink kind × message kind))
//!     → console / disc / attached network & SSE transports
//! ```
//!
//! # Design Decisions
//! - Producers never await I/O; a paused consumer cannot slow dispatch
//! - FIFO within a channel; no ordering across channels
//! - `stop()` terminates only the consumers, never in-flight requests

pub mod event;
pub mod message;
pub mod registry;
pub mod sink;

pub use event::{LogEvent, LogTarget};
pub use message::{LogMessage, MessageKind};
pub use registry::{EventRegistry, LoggingError};
pub use sink::{SinkHub, SinkError};
