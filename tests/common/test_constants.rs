//! Shared constants for integration tests.
//!
//! Integration tests are compiled as separate crates (one per top-level file in
//! `tests/`). Placing shared constants under `tests/common/` avoids creating an
//! additional integration test binary while still allowing reuse via:
//!
//! ```rust
//! #[path = "common/test_constants.rs"]
//! mod test_constants;
//! ```

/// Default EC2 flavor used by Bosun when no override is provided.
pub const DEFAULT_FLAVOR: &str = "m1.small";

/// Node name used for the server under test.
pub const NODE_NAME: &str = "chef.bosun.test";
