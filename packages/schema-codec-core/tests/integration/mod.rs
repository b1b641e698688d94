//! Integration test suite.
//!
//! 1. Schema evolution: skip safety, frame exactness, cache behaviour
//! 2. Reentrant migration refusal through nested decodes
//! 3. Concurrent encode/decode with live schema changes

pub mod concurrency_tests;
pub mod evolution_tests;
pub mod helpers;
