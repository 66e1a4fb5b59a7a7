//! # ForgeChain Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/
//! ├── benches/          # Criterion benchmarks for push admission
//! └── src/integration/  # End-to-end push validation flows
//!     ├── flows.rs         # Note → objects → admission → endorsement
//!     └── post_threads.rs  # Issue and merge request threads over several pushes
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p fc-tests
//!
//! # Benchmarks
//! cargo bench -p fc-tests
//! ```

pub mod integration;
