//! HTTP middleware.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layers (hub per request, transactions)
//! 2. CORS (allowed origins from config)
//! 3. `TraceLayer` (request span with a `request_id` field)
//! 4. Request ID (fills the span field, echoes the header)
//! 5. Rate limiting on `/api/auth` (governor)

pub mod rate_limit;
pub mod request_id;

pub use rate_limit::auth_rate_limiter;
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
