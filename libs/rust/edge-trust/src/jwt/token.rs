//! Type-state JWT token.
//!
//! A token moves `Unvalidated → SignatureValidated → Validated`. Claims are
//! decoded during signature validation but are only exposed once the time,
//! type and issuer checks have passed, so no code path can read identity off
//! a token that has not been fully verified.

use std::marker::PhantomData;

use jsonwebtoken::{Algorithm, DecodingKey, Header, Validation, decode, decode_header};
use jsonwebtoken::errors::ErrorKind;

use crate::jwt::claims::{Claims, TokenType};
use crate::jwt::error::TokenError;

mod private {
    pub trait Sealed {}
}

/// Marker trait for token validation states.
pub trait TokenState: private::Sealed {
    /// What the token carries in this state.
    type Payload;

    /// Human-readable state name for debugging.
    fn state_name() -> &'static str;
}

/// Parsed header only.
#[derive(Debug)]
pub struct Unvalidated;
impl private::Sealed for Unvalidated {}
impl TokenState for Unvalidated {
    type Payload = ();

    fn state_name() -> &'static str {
        "Unvalidated"
    }
}

/// Signature verified, claims decoded but not yet checked.
#[derive(Debug)]
pub struct SignatureValidated;
impl private::Sealed for SignatureValidated {}
impl TokenState for SignatureValidated {
    type Payload = Claims;

    fn state_name() -> &'static str {
        "SignatureValidated"
    }
}

/// Signature and claims verified.
#[derive(Debug)]
pub struct Validated;
impl private::Sealed for Validated {}
impl TokenState for Validated {
    type Payload = Claims;

    fn state_name() -> &'static str {
        "Validated"
    }
}

/// JWT in a given validation state.
#[derive(Debug)]
pub struct Token<S: TokenState> {
    raw: String,
    header: Header,
    payload: S::Payload,
    _state: PhantomData<S>,
}

/// Claim checks applied in the `SignatureValidated → Validated` step.
#[derive(Debug, Clone, Copy)]
pub struct ClaimRules<'a> {
    /// Clock, epoch seconds
    pub now: i64,
    /// Required `token_type`
    pub expected_type: TokenType,
    /// Required `iss`, if any
    pub issuer: Option<&'a str>,
}

impl Token<Unvalidated> {
    /// Parse the header of a raw JWT.
    ///
    /// # Errors
    ///
    /// `Malformed` when the header cannot be decoded, which includes
    /// `alg: none`.
    pub fn parse(raw: &str) -> Result<Self, TokenError> {
        let header = decode_header(raw).map_err(|e| TokenError::Malformed {
            reason: format!("invalid header: {e}"),
        })?;

        Ok(Self {
            raw: raw.to_string(),
            header,
            payload: (),
            _state: PhantomData,
        })
    }

    /// Algorithm named in the header.
    #[must_use]
    pub const fn algorithm(&self) -> Algorithm {
        self.header.alg
    }

    /// Verify the signature with `key`, requiring `algorithm`.
    ///
    /// # Errors
    ///
    /// `AlgorithmMismatch`, `InvalidSignature` or `Malformed`.
    pub fn validate_signature(
        self,
        key: &DecodingKey,
        algorithm: Algorithm,
    ) -> Result<Token<SignatureValidated>, TokenError> {
        if self.header.alg != algorithm {
            return Err(TokenError::AlgorithmMismatch);
        }

        // Time and claim checks happen in the next step against an explicit clock.
        let mut validation = Validation::new(algorithm);
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.validate_aud = false;
        validation.required_spec_claims.clear();

        let data = decode::<Claims>(&self.raw, key, &validation).map_err(|e| match e.kind() {
            ErrorKind::InvalidSignature => TokenError::InvalidSignature,
            ErrorKind::InvalidAlgorithm => TokenError::AlgorithmMismatch,
            _ => TokenError::Malformed {
                reason: e.to_string(),
            },
        })?;

        Ok(Token {
            raw: self.raw,
            header: self.header,
            payload: data.claims,
            _state: PhantomData,
        })
    }
}

impl Token<SignatureValidated> {
    /// Check expiry, type and issuer.
    ///
    /// # Errors
    ///
    /// `Expired`, `WrongType` or `IssuerMismatch`.
    pub fn validate_claims(self, rules: ClaimRules<'_>) -> Result<Token<Validated>, TokenError> {
        let claims = &self.payload;

        if claims.is_expired_at(rules.now) {
            return Err(TokenError::Expired {
                expired_at: claims.exp,
            });
        }

        if claims.token_type != rules.expected_type {
            return Err(TokenError::WrongType {
                expected: rules.expected_type,
                found: claims.token_type,
            });
        }

        if let Some(issuer) = rules.issuer {
            if claims.iss.as_deref() != Some(issuer) {
                return Err(TokenError::IssuerMismatch);
            }
        }

        Ok(Token {
            raw: self.raw,
            header: self.header,
            payload: self.payload,
            _state: PhantomData,
        })
    }
}

impl Token<Validated> {
    /// Verified claims.
    #[must_use]
    pub const fn claims(&self) -> &Claims {
        &self.payload
    }

    /// Consume the token, keeping the claims.
    #[must_use]
    pub fn into_claims(self) -> Claims {
        self.payload
    }

    /// Subject claim.
    #[must_use]
    pub fn subject(&self) -> &str {
        &self.payload.sub
    }

    /// Expiry, epoch seconds.
    #[must_use]
    pub const fn expires_at(&self) -> i64 {
        self.payload.exp
    }

    /// The raw token string.
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// The token header.
    #[must_use]
    pub const fn header(&self) -> &Header {
        &self.header
    }
}

impl<S: TokenState> Token<S> {
    /// Current state name.
    #[must_use]
    pub fn state_name(&self) -> &'static str {
        S::state_name()
    }
}
