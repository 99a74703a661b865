//! # API Route Modules
//!
//! - `voting`: the four steps of the voting flow (`/api/send-otp`,
//!   `/api/verify-otp`, `/api/verify-iris`, `/api/vote`).
//! - `status`: read-only view of a voter's progress (`/api/status`).
//!
//! Health checks, `/metrics`, and `/openapi.json` are mounted in
//! [`crate::app`] and [`crate::openapi`].

pub mod status;
pub mod voting;
