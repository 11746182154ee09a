//! Row structs for the analysis tables.
//!
//! Each struct is a `FromRow` mirror of its table and converts into the
//! domain-level [`sigflow_core::record::AnalysisRecord`].

pub mod analysis;
