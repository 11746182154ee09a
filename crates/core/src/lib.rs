//! Domain logic for the analysis gateway.
//!
//! Everything here is free of HTTP and database concerns: job kinds and their
//! positional worker contract, upload staging, the external process runner,
//! and reading what the worker leaves behind.

pub mod error;
pub mod job;
pub mod output;
pub mod record;
pub mod staging;
pub mod types;
pub mod worker;
