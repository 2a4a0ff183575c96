//! Synthetic observation streams and CSV export of batch output.

pub mod demand;
pub mod reporting;
