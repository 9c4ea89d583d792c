//! # Storefront Test Suite
//!
//! Cross-crate flows: platform, store manager, state bridge and runtime
//! exercised together.
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! └── integration/
//!     ├── fixtures.rs   # Catalog, transactions, gated platform
//!     ├── flows.rs      # Purchase, listener and restart flows
//!     └── bridge.rs     # Delivery context and replay-latest behavior
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! cargo test -p store-tests
//! cargo test -p store-tests integration::flows::
//! ```

#![allow(dead_code)]

pub mod integration;
