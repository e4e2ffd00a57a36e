//! End-to-end tests live under `tests/`. This crate has no library code.
