//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transactions), added in `main`
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//!
//! `ActingUser` is an extractor, run per handler.

pub mod acting_user;
pub mod request_id;

pub use acting_user::{ACTING_USER_HEADER, ActingUser};
pub use request_id::{REQUEST_ID_HEADER, RequestId, request_id_middleware};
