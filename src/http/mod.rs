//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP/TLS connection
//!     → server.rs (axum setup, request translation, request ID)
//!     → request.rs / response.rs (engine-level models)
//!     → dispatch loop (pipeline → routing → handler)
//!     → server.rs (write response, propagate x-request-id)
//! ```

pub mod handler;
pub mod request;
pub mod response;
pub mod server;

pub use handler::{handler, HandlerError, HandlerRef, RequestHandler};
pub use request::{Request, RequestId};
pub use response::Response;
pub use server::{HttpServer, ServerError};
