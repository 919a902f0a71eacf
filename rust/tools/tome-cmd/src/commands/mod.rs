//! Command implementations for tome-cmd

pub mod checksum;
pub mod copy;
