//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! Connection adapter (parsed Request)
//!     → pipeline.rs (ordered stages, may answer early)
//!     → routing::resolver (tree first, template table fallback)
//!     → handler invocation (isolated task)
//!     → error translation (404/405/406/500, structured JSON bodies)
//!     → logging::registry (fire-and-forget events) → sinks
//! ```
//!
//! # Design Decisions
//! - A client always receives a well-formed response; router and handler
//!   failures never drop the connection
//! - Log emission is enqueue-only; dispatch latency is independent of
//!   sink I/O

pub mod dispatcher;
pub mod pipeline;

pub use dispatcher::Dispatcher;
pub use pipeline::{FnStage, PipelineStage, StageRef};
