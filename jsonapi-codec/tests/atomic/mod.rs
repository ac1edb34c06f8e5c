//! Atomic operations tests
//!
//! Structural reading, local-ID validation and batch processing against a recording
//! handler.

mod processor;
mod reader;
