//! Request middleware.
//!
//! Request-scoped concerns that wrap every handler. `Trace` tags each request
//! with a trace id that error payloads and logs pick up.

pub mod trace;

pub use trace::Trace;
