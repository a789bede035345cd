//! End-to-end tests for the hub live under `tests/`.
