//! Request correlation
//!
//! Every request gets a fresh id that tags all entries logged while it is
//! handled.

mod request_context;

pub use request_context::{generate_request_id, RequestContext, HTTP_CONTEXT};
