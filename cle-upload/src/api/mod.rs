//! HTTP API handlers for cle-upload
//!
//! Poll-based surface for the dashboard plus an SSE feed of the same state.

pub mod health;
pub mod sse;
pub mod upload;

pub use health::health_routes;
pub use sse::upload_event_stream;
pub use upload::upload_routes;
