//! Shared test utilities for edu-platform Rust crates.
//!
//! This crate provides:
//! - Proptest generators for requests, identities and secrets
//! - Key/value store doubles that fail or stall on demand
//! - Fixtures: sample users, secrets and raw JWT minting (including forged
//!   tokens) independent of the production issuer

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod fixtures;
pub mod generators;
pub mod mocks;

pub use generators::*;
