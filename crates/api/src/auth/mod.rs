//! Authentication for the recibo API.
//!
//! The identity provider issues HS256 JWTs; this module only validates the
//! signature and lifts the opaque `sub` claim into an [`AccountId`]. The
//! internal extraction route authenticates with a static service token
//! instead.
//!
//! [`AccountId`]: recibo_core::AccountId

pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtManager};
pub use middleware::{account_from_headers, require_auth, require_internal_token};
