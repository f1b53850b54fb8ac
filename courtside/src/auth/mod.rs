//! Caller identity and access tokens.
//!
//! The tournament core trusts a [`Principal`]; the server builds one from a
//! bearer token through [`TokenVerifier`].

pub mod errors;
pub mod manager;
pub mod models;

pub use errors::{AuthError, AuthResult};
pub use manager::TokenVerifier;
pub use models::{AccessTokenClaims, Principal};
