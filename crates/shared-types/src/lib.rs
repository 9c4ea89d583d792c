//! # Shared Types Crate
//!
//! Data model owned by the commerce platform and shared by every crate in the
//! workspace.
//!
//! ## Design Principles
//!
//! - **Platform-owned**: transactions and catalog items are produced by the
//!   platform; the store only reads and reshapes them.
//! - **Verification is explicit**: every transaction arrives wrapped in a
//!   `VerificationResult` and must be unwrapped before use.

pub mod entities;
pub mod errors;

pub use entities::*;
pub use errors::*;
