#![deny(missing_docs)]

//! # evote-core — Foundational Types for the eVote Stack
//!
//! Defines the identity primitives every other crate in the workspace
//! depends on. It has no internal crate dependencies, only `serde`,
//! `thiserror`, and `chrono` from the external ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Newtype wrappers for request fields.** A [`VoterId`] cannot be passed
//!    where a [`PhoneNumber`] is expected, and neither can be constructed
//!    empty. Field presence is checked once, at the boundary.
//!
//! 2. **The identity key is the pair.** A voter record is addressed by
//!    [`IdentityKey`] = `(voterId, phone)`, never by `voterId` alone.
//!
//! 3. **UTC only.** [`Timestamp`] is the single time type stored on records.

pub mod ballot;
pub mod error;
pub mod identity;
pub mod temporal;

pub use ballot::{BallotChoice, BiometricSample, SubmittedCode};
pub use error::ValidationError;
pub use identity::{IdentityKey, PhoneNumber, VoterId};
pub use temporal::Timestamp;
