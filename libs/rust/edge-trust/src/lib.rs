//! Edge trust and request integrity for edu-platform services.
//!
//! The gateway authenticates end users with a bearer JWT, checks it against
//! the revocation list, replaces any client-supplied identity headers with the
//! verified ones, and signs every forwarded hop with HMAC-SHA256. Each
//! internal service re-verifies that signature before a handler runs.
//!
//! - [`jwt`]: claims, type-state validation and issuance
//! - [`revocation`]: revoked-token store with per-entry expiry
//! - [`signer`] / [`verifier`]: the two ends of a signed hop
//! - [`headers`]: header names and [`TrustedIdentity`]

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod body;
pub mod error;
pub mod headers;
pub mod jwt;
pub mod paths;
pub mod replay;
pub mod revocation;
pub mod signature;
pub mod signer;
pub mod verifier;

pub use body::{BufferedBody, sha256_hex};
pub use error::{AuthFailure, Credential, ErrorBody, TrustError};
pub use headers::{TrustedIdentity, bearer_token};
pub use jwt::{Claims, TokenError, TokenIssuer, TokenType, TokenValidator};
pub use paths::PublicPaths;
pub use replay::ReplayPolicy;
pub use revocation::RevocationStore;
pub use signature::{SignedEnvelope, SigningKey, canonical_string};
pub use signer::RequestSigner;
pub use verifier::{InternalVerifier, InternalVerifierLayer, VerifierConfig};
