pub mod analysis;
pub mod form;
