//! Tower middleware for the gateway.

pub mod derived_identity;
pub mod edge_auth;
pub mod tracing;

pub use derived_identity::DerivedIdentityLayer;
pub use edge_auth::{EdgeAuthLayer, EdgeAuthenticator, EdgeDecision};
pub use self::tracing::TracingLayer;
