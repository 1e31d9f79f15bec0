//! Authentication module
//!
//! OAuth2 client-credentials grant with a cached, self-refreshing credential.
//! The `TokenManager` is the only owner of the access token; the rest of the
//! client sees a `Credential` that can attach itself to a request.

mod manager;
mod types;

pub use manager::TokenManager;
pub use types::{ClientCredentials, Credential};
