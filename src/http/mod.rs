//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, one task per connection)
//!     → proxy.rs (forwarding engine)
//!         → request.rs (host substitution, header hygiene)
//!         → hyper client → backend
//!         → response.rs (stream back, map failures)
//!         → recorder.rs (observe final status)
//!     → Send to client
//! ```

pub mod proxy;
pub mod recorder;
pub mod request;
pub mod response;
pub mod server;

pub use recorder::StatusRecorder;
pub use response::ProxyError;
pub use server::{AppState, HttpServer, ServerError};
