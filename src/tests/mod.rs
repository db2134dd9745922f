//! End-to-end tests of the full placement pipeline.
