//! Console authentication and caller identity.
//!
//! Console requests carry HTTP Basic credentials. A successful check yields
//! a [`ConsoleUser`] whose username doubles as the tenant every lifecycle
//! call is scoped to.
//!
//! ## Accounts
//!
//! - `root` and `guest` always exist; their passwords default to their
//!   names and can be overridden in the console config
//! - any number of extra accounts can be configured
//!
//! Credentials are never kept in clear text: the extractor stores the
//! SHA-256 digest of `username:password` and compares digests.

mod context;
mod extractor;

pub use context::ConsoleUser;
pub use extractor::{Account, AuthConfig, AuthError, AuthExtractor, AUTH_REALM, credential_digest};
