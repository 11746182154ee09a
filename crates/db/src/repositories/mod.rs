//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async query methods
//! that accept `&PgPool` as the first argument.

pub mod analysis_repo;

pub use analysis_repo::AnalysisRepo;
