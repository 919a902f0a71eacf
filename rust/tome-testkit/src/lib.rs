//! Test utilities for the Tome crates.
//!
//! This crate provides:
//! - Data generation: seeded pseudo-random payloads and temporary files holding them
//! - Scripted and gated `ByteSource` implementations for driving a `PrefetchStream`
//!   through precise chunking, failure and blocking scenarios

pub mod data_gen;
pub mod sources;
