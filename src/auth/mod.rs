mod claims;
pub mod error;
pub mod jwt;
pub mod middleware;
pub mod password;

pub use middleware::{require_auth, AuthUser};
