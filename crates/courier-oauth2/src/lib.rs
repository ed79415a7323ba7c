//! OAuth2 credential store for courier.
//!
//! [`CredentialStore`] owns the mail provider credential for the whole
//! process: it loads the token file, refreshes expired access tokens, and
//! (when enabled) runs the installed-app consent flow.
//!
//! # Security
//!
//! - Consent uses PKCE (S256) and a random `state` checked on redirect.
//! - Token files are written atomically with 0600 permissions.
//! - The client secret comes from the environment, never from config files.
//! - Rotated refresh tokens are persisted before the new credential is used.

pub mod consent;
pub mod exchange;
pub mod pkce;
pub mod store;
pub mod token_store;
pub mod types;

pub use consent::{ConsentFlow, LoopbackConsent};
pub use exchange::TokenEndpoint;
pub use store::CredentialStore;
pub use token_store::TokenStore;
pub use types::{AuthorizationGrant, Credential, CredentialStatus, OAuth2ProviderConfig};
