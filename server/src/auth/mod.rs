mod crypto;
mod db;
mod extractor;
mod middleware;

pub use crypto::{hash_password, verify_password, CryptoError};
pub use db::{create_session, delete_session, SessionError};
pub use extractor::{bearer_token, AuthUser};
pub use middleware::require_auth;
