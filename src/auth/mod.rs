//! Session authentication
//!
//! Handles:
//! - Signed session credentials carried in a cookie
//! - Authentication middleware for protected routes

mod middleware;
pub mod session;

pub use middleware::{UpstreamToken, require_auth};
pub use session::{
    Session, SessionError, create_session_token, removal_cookie, session_cookie,
    verify_session_token,
};
