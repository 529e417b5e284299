//! Fuzzing library for archive-auth.
//!
//! This crate provides fuzzing targets for everything that parses untrusted input
//! before authentication: bearer headers, token structure, and grant forms.
//!
//! # Usage
//!
//! ```bash
//! cd crates/archive-fuzz
//! cargo +nightly fuzz run fuzz_token_verify -- -max_total_time=60
//! ```

pub use archive_auth::server::oauth;
pub use archive_auth::token;
