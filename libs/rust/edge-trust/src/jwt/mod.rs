//! Platform JWTs: claims, type-state validation, and issuance.

pub mod claims;
pub mod error;
pub mod issuer;
pub mod token;
pub mod validator;

pub use claims::{Claims, TokenType};
pub use error::TokenError;
pub use issuer::{IssuedToken, TokenIssuer, TokenPair, TokenSubject};
pub use token::{ClaimRules, SignatureValidated, Token, TokenState, Unvalidated, Validated};
pub use validator::TokenValidator;
