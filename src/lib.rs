//! Google Sheets automation for audio-delivery QC tracking.
//!
//! Two pipelines against one spreadsheet:
//! - [`projector`]: copies the Audio sheet into a Raw working sheet, rewriting
//!   data columns as SUBSTITUTE-based numeric coercion formulas.
//! - [`summary`]: rebuilds the batch summary sheet from the Raw sheet with
//!   per-stage hour aggregations and a per-district rollup.
//!
//! Everything durable lives in the remote spreadsheet; each run recomputes
//! its output wholesale.

pub mod google_api;
pub mod grid;
pub mod projector;
pub mod summary;
